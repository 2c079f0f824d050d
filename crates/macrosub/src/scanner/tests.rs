use alloc::string::{String, ToString};
use alloc::vec::Vec;

use rstest::rstest;

use super::find_token;
use crate::search::TokenSearch;
use crate::token::{Token, TokenData, TokenKind};

fn find(text: &str, search: TokenSearch) -> Option<Token> {
    find_token(text, 0, search)
}

fn find_basic(text: &str) -> Option<Token> {
    find(text, TokenSearch::BASIC)
}

/// Enumerates all tokens left to right.
fn all_tokens(text: &str, search: TokenSearch) -> Vec<Token> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(token) = find_token(text, pos, search) {
        pos = token.loc.r + 1;
        out.push(token);
    }
    out
}

#[rstest]
#[case("{M}", "M")]
#[case("{HOST.NAME}", "HOST.NAME")]
#[case("{TRIGGER.VALUE}", "TRIGGER.VALUE")]
#[case("{A_B.C_1}", "A_B.C_1")]
#[case("{M.}", "M.")]
#[case("{123ABC}", "123ABC")]
#[case("{EVENT.TAGS.\"tag name\"}", "EVENT.TAGS.\"tag name\"")]
#[case("{EVENT.TAGS.\"a\\\"b\\\\c\"}", "EVENT.TAGS.\"a\\\"b\\\\c\"")]
#[case("{\"only quoted\"}", "\"only quoted\"")]
fn plain_macro_name_and_outer_spans(#[case] text: &str, #[case] name: &str) {
    let token = find_basic(text).unwrap();
    assert_eq!(token.kind(), TokenKind::Macro);
    assert_eq!(token.loc.slice(text), text);
    let TokenData::Macro { name: name_loc } = token.data else { panic!("not a macro") };
    assert_eq!(name_loc.slice(text), name);
}

#[rstest]
#[case("{}")]
#[case("{lower}")]
#[case("{A B}")]
#[case("{ A}")]
#[case("{A")]
#[case("{A-B}")]
#[case("{\"\"}")]
#[case("{A.\"q\"B}")]
#[case("{EVENT.TAGS.\"a\\xb\"}")]
fn malformed_plain_macros_are_literal_text(#[case] text: &str) {
    assert_eq!(find_basic(text), None);
}

#[test]
fn scanning_resumes_after_a_failed_brace() {
    let text = "a {not valid} but {OK} here";
    let token = find_basic(text).unwrap();
    assert_eq!(token.text(text), "{OK}");
}

#[test]
fn finds_from_the_given_offset() {
    let text = "{A} {B}";
    let token = find_token(text, 1, TokenSearch::BASIC).unwrap();
    assert_eq!(token.text(text), "{B}");
}

#[test]
fn enumeration_is_left_to_right_and_non_overlapping() {
    let text = "{A}x{12}y{#D}z{$U}";
    let kinds: Vec<_> = all_tokens(text, TokenSearch::BASIC).iter().map(Token::kind).collect();
    assert_eq!(
        kinds,
        [TokenKind::Macro, TokenKind::ObjectId, TokenKind::DiscoveryMacro, TokenKind::UserMacro]
    );
}

#[test]
fn object_id_keeps_its_digits() {
    let text = "{21089}";
    let token = find_basic(text).unwrap();
    let TokenData::ObjectId { id } = token.data else { panic!("not an object id") };
    assert_eq!(id.slice(text), "21089");
}

#[rstest]
#[case("{$MACRO}", "MACRO", None)]
#[case("{$M:ctx}", "M", Some("ctx"))]
#[case("{$M:\"a}b\"}", "M", Some("\"a}b\""))]
fn user_macro_tokens_expose_name_and_context(#[case] text: &str, #[case] name: &str, #[case] context: Option<&str>) {
    let token = find_basic(text).unwrap();
    assert_eq!(token.kind(), TokenKind::UserMacro);
    assert_eq!(token.loc.slice(text), text);
    let TokenData::UserMacro { name: name_loc, context: ctx } = token.data else { panic!("not a user macro") };
    assert_eq!(name_loc.slice(text), name);
    assert_eq!(ctx.map(|c| c.loc.slice(text).to_string()), context.map(String::from));
}

#[test]
fn empty_user_macro_is_literal_text() {
    assert_eq!(find_basic("{$}"), None);
    assert_eq!(find_basic("some {$} text"), None);
}

#[test]
fn discovery_macro_requires_a_name() {
    let text = "{#FSNAME}";
    let token = find_basic(text).unwrap();
    assert_eq!(token.kind(), TokenKind::DiscoveryMacro);
    let TokenData::DiscoveryMacro { name } = token.data else { panic!("not a discovery macro") };
    assert_eq!(name.slice(text), "FSNAME");
    assert_eq!(find_basic("{#}"), None);
}

mod references {
    use super::*;

    const SEARCH: TokenSearch = TokenSearch::REFERENCES;

    #[test]
    fn reference_is_reported_when_it_precedes_the_next_brace() {
        let text = "see $2 and {A}";
        let token = find(text, SEARCH).unwrap();
        assert_eq!(token.kind(), TokenKind::Reference);
        assert_eq!(token.loc.slice(text), "$2");
        let TokenData::Reference { index } = token.data else { panic!("not a reference") };
        assert_eq!(index, 2);
    }

    #[test]
    fn brace_token_wins_when_it_comes_first() {
        let text = "{A} then $3";
        let first = find(text, SEARCH).unwrap();
        assert_eq!(first.kind(), TokenKind::Macro);
        let second = find_token(text, first.loc.r + 1, SEARCH).unwrap();
        assert_eq!(second.kind(), TokenKind::Reference);
    }

    #[test]
    fn escaped_and_bare_dollars_are_skipped() {
        assert_eq!(find("cost $ 10 and \\$5", SEARCH), None);
        let text = "\\$5 but $6";
        assert_eq!(find(text, SEARCH).unwrap().loc.slice(text), "$6");
    }

    #[test]
    fn without_the_flag_references_are_ignored() {
        assert_eq!(find_basic("take $1"), None);
    }
}

mod expression_macros {
    use super::*;

    const SEARCH: TokenSearch = TokenSearch::EXPRESSION_MACRO;

    #[rstest]
    #[case("{?last(/host/key)>10}", "last(/host/key)>10")]
    #[case("{?\"}\"}", "\"}\"")]
    #[case("{?\"\\\"}\"}", "\"\\\"}\"")]
    fn expression_runs_to_the_unquoted_brace(#[case] text: &str, #[case] expression: &str) {
        let token = find(text, SEARCH).unwrap();
        assert_eq!(token.kind(), TokenKind::ExpressionMacro);
        assert_eq!(token.loc.slice(text), text);
        let TokenData::ExpressionMacro { expression: e } = token.data else { panic!("not an expression macro") };
        assert_eq!(e.slice(text), expression);
    }

    #[test]
    fn inner_placeholders_are_stepped_over() {
        let text = "{?{ITEM.LASTVALUE}>{$THRESHOLD}}";
        let token = find(text, SEARCH).unwrap();
        assert_eq!(token.loc.slice(text), text);
    }

    #[test]
    fn empty_or_unterminated_expressions_fail() {
        assert_eq!(find("{?}", SEARCH), None);
        assert_eq!(find("{?last(", SEARCH), None);
    }

    #[test]
    fn disabled_flag_leaves_the_inner_macro_visible() {
        let text = "{?{ITEM.LASTVALUE}>10}";
        let token = find_basic(text).unwrap();
        assert_eq!(token.kind(), TokenKind::Macro);
        assert_eq!(token.loc.slice(text), "{ITEM.LASTVALUE}");
    }
}

mod nested_shapes {
    use super::*;

    #[test]
    fn plain_macro_through_a_function() {
        let text = "{{ITEM.VALUE}.regsub(\"(.*)\", \\1)}";
        let token = find_basic(text).unwrap();
        assert_eq!(token.kind(), TokenKind::FuncMacro);
        assert_eq!(token.loc.slice(text), text);
        let TokenData::FuncMacro(data) = token.data else { panic!("not a func macro") };
        assert_eq!(data.inner.slice(text), "{ITEM.VALUE}");
        assert_eq!(data.func.slice(text), "regsub(\"(.*)\", \\1)");
        assert_eq!(data.func_param.slice(text), "(\"(.*)\", \\1)");
    }

    #[test]
    fn discovery_macro_through_a_function_takes_precedence() {
        let text = "{{#LLD}.func()}";
        let token = find_basic(text).unwrap();
        assert_eq!(token.kind(), TokenKind::DiscoveryFuncMacro);
        let TokenData::DiscoveryFuncMacro(data) = token.data else { panic!("not a discovery func macro") };
        assert_eq!(data.inner.slice(text), "{#LLD}");
    }

    #[test]
    fn user_macro_through_a_function() {
        let text = "{{$M:ctx}.fmtnum(2)}";
        let token = find_basic(text).unwrap();
        assert_eq!(token.kind(), TokenKind::UserFuncMacro);
        let TokenData::UserFuncMacro(data) = token.data else { panic!("not a user func macro") };
        assert_eq!(data.inner.slice(text), "{$M:ctx}");
    }

    #[test]
    fn expression_macro_through_a_function() {
        let text = "{{?last(/h/k)}.fmttime(%H)}";
        let token = find(text, TokenSearch::EXPRESSION_MACRO).unwrap();
        assert_eq!(token.kind(), TokenKind::FuncMacro);
        let TokenData::FuncMacro(data) = token.data else { panic!("not a func macro") };
        assert_eq!(data.inner.slice(text), "{?last(/h/k)}");
    }

    #[test]
    fn trailing_spaces_before_the_closing_brace_are_tolerated() {
        let text = "{{ITEM.VALUE}.fmtnum(2)  }";
        let token = find_basic(text).unwrap();
        assert_eq!(token.loc.slice(text), text);
    }

    #[test]
    fn nested_macro_as_simple_macro_host() {
        let text = "{{HOST.HOST}:key[1].last(0)}";
        let token = find(text, TokenSearch::SIMPLE_MACRO).unwrap();
        assert_eq!(token.kind(), TokenKind::SimpleMacro);
        let TokenData::SimpleMacro(data) = token.data else { panic!("not a simple macro") };
        assert_eq!(data.host.slice(text), "{HOST.HOST}");
        assert_eq!(data.key.slice(text), "key[1]");
        assert_eq!(data.func.slice(text), "last(0)");
    }

    #[test]
    fn nested_discovery_macro_as_simple_macro_host() {
        let text = "{{#FSNAME}:vfs.fs.size[{#FSNAME},free].last(0)}";
        let token = find(text, TokenSearch::SIMPLE_MACRO).unwrap();
        assert_eq!(token.kind(), TokenKind::SimpleMacro);
        let TokenData::SimpleMacro(data) = token.data else { panic!("not a simple macro") };
        assert_eq!(data.host.slice(text), "{#FSNAME}");
    }

    #[test]
    fn host_form_needs_the_simple_macro_flag() {
        let text = "{{HOST.HOST}:key.last(0)}";
        let token = find_basic(text).unwrap();
        // the nested shape fails, leaving the embedded macro itself
        assert_eq!(token.kind(), TokenKind::Macro);
        assert_eq!(token.loc.slice(text), "{HOST.HOST}");
    }

    #[test]
    fn failed_function_does_not_fall_back_to_a_simple_macro() {
        // the dot continuation is attempted and its failure fails the whole
        // shape, even though a colon follows later
        let text = "{{A}.x:key.last(0)}";
        let token = find(text, TokenSearch::SIMPLE_MACRO).unwrap();
        assert_eq!(token.kind(), TokenKind::Macro);
        assert_eq!(token.loc.slice(text), "{A}");
    }

    #[test]
    fn other_continuations_fail_the_whole_shape() {
        let text = "{{A}x}";
        let token = find_basic(text).unwrap();
        assert_eq!(token.loc.slice(text), "{A}");
    }
}

mod simple_macros {
    use super::*;

    const SEARCH: TokenSearch = TokenSearch::SIMPLE_MACRO;

    #[test]
    fn host_key_and_function_are_split() {
        let text = "{db node 1:system.cpu.load[all,avg1].last(0)}";
        let token = find(text, SEARCH).unwrap();
        assert_eq!(token.kind(), TokenKind::SimpleMacro);
        assert_eq!(token.loc.slice(text), text);
        let TokenData::SimpleMacro(data) = token.data else { panic!("not a simple macro") };
        assert_eq!(data.host.slice(text), "db node 1");
        assert_eq!(data.key.slice(text), "system.cpu.load[all,avg1]");
        assert_eq!(data.func.slice(text), "last(0)");
        assert_eq!(data.func_param.slice(text), "(0)");
    }

    #[test]
    fn parameterless_key_backs_up_to_the_function_dot() {
        let text = "{host:key.last(0)}";
        let TokenData::SimpleMacro(data) = find(text, SEARCH).unwrap().data else { panic!("not a simple macro") };
        assert_eq!(data.key.slice(text), "key");
        assert_eq!(data.func.slice(text), "last(0)");
    }

    #[test]
    fn user_macro_may_stand_in_for_the_key() {
        let text = "{host:{$KEY}.last(0)}";
        let TokenData::SimpleMacro(data) = find(text, SEARCH).unwrap().data else { panic!("not a simple macro") };
        assert_eq!(data.key.slice(text), "{$KEY}");
    }

    #[rstest]
    #[case("{host:key.last(0)x}")]
    #[case("{host:.last(0)}")]
    #[case("{:key.last(0)}")]
    #[case("{host:key}")]
    #[case("{ho$t:key.last(0)}")]
    fn malformed_simple_macros_fail(#[case] text: &str) {
        assert_eq!(find(text, SEARCH), None);
    }

    #[test]
    fn needs_the_flag() {
        assert_eq!(find_basic("{host:key.last(0)}"), None);
    }
}

mod quote_awareness {
    use super::*;

    const SEARCH: TokenSearch = TokenSearch::IGNORE_QUOTED;

    #[test]
    fn quoted_braces_are_not_candidates() {
        let text = "\"{IGNORED}\" {SEEN}";
        let token = find(text, SEARCH).unwrap();
        assert_eq!(token.loc.slice(text), "{SEEN}");
    }

    #[test]
    fn escaped_quotes_do_not_close_the_run() {
        let text = "\"a\\\"{IGNORED}\" {SEEN}";
        assert_eq!(find(text, SEARCH).unwrap().loc.slice(text), "{SEEN}");
    }

    #[test]
    fn unterminated_quote_ends_the_scan() {
        assert_eq!(find("\"{NEVER}", SEARCH), None);
    }

    #[test]
    fn without_the_flag_quotes_are_ordinary_text() {
        let text = "\"{SEEN}\"";
        assert_eq!(find_basic(text).unwrap().loc.slice(text), "{SEEN}");
    }
}

mod var_macros {
    use super::*;

    const SEARCH: TokenSearch = TokenSearch::VAR_MACRO;

    #[test]
    fn bare_variable_names_are_tokens() {
        let text = "got {response} back";
        let token = find(text, SEARCH).unwrap();
        assert_eq!(token.kind(), TokenKind::VarMacro);
        let TokenData::VarMacro { name } = token.data else { panic!("not a var macro") };
        assert_eq!(name.slice(text), "response");
    }

    #[test]
    fn variable_through_a_function() {
        let text = "{code.btoa()}";
        let token = find(text, SEARCH).unwrap();
        assert_eq!(token.kind(), TokenKind::VarFuncMacro);
        let TokenData::VarFuncMacro(data) = token.data else { panic!("not a var func macro") };
        assert_eq!(data.inner.slice(text), "code");
        assert_eq!(data.func.slice(text), "btoa()");
    }

    #[test]
    fn ordinary_kinds_still_work_in_var_mode() {
        let text = "x {$USER} y";
        assert_eq!(find(text, SEARCH).unwrap().kind(), TokenKind::UserMacro);
        let text = "x {#D} y";
        assert_eq!(find(text, SEARCH).unwrap().kind(), TokenKind::DiscoveryMacro);
    }

    #[test]
    fn nested_shapes_are_disabled_in_var_mode() {
        let text = "{{ITEM.VALUE}.fmtnum(2)}";
        // the outer double brace is skipped; only the embedded macro itself
        // is found
        let token = find(text, SEARCH).unwrap();
        assert_eq!(token.loc.slice(text), "{ITEM.VALUE}");
        assert_eq!(token.kind(), TokenKind::Macro);
    }

    #[test]
    fn without_the_flag_var_names_are_literal() {
        assert_eq!(find_basic("{response}"), None);
    }
}

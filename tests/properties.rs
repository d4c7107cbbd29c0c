//==============================================
// File: tests/properties.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Property checks for the front end and dice
// Objective: Rendering then re-parsing keeps the AST shape; roll() stays in
//            the dice range; the lexer never panics
//==============================================

use proptest::prelude::*;
use rulescript::interpreter::Evaluator;
use rulescript::{Value, compile, tokenize};

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..1000).prop_map(|n| n.to_string()),
        (0u32..100, 1u32..100).prop_map(|(a, b)| format!("{a}.{b:02}")),
        "v_[a-z]{1,4}",
        "[a-z ]{0,6}".prop_map(|s| format!("\"{s}\"")),
        Just("true".to_string()),
        Just("false".to_string()),
    ]
}

fn expression() -> impl Strategy<Value = String> {
    const OPS: &[&str] = &[
        "||", "&&", "==", "!=", ">", "<", ">=", "<=", "+", "-", "*", "/", "%", "**",
    ];
    leaf().prop_recursive(4, 32, 3, |inner| {
        prop_oneof![
            (inner.clone(), 0..OPS.len(), inner.clone())
                .prop_map(|(l, op, r)| format!("({l} {} {r})", OPS[op])),
            (prop_oneof![Just("-"), Just("!")], inner.clone())
                .prop_map(|(op, e)| format!("{op}({e})")),
            prop::collection::vec(inner.clone(), 0..3)
                .prop_map(|items| format!("[{}]", items.join(", "))),
            (inner.clone(), inner.clone()).prop_map(|(a, i)| format!("({a})[{i}]")),
            (inner.clone(), "p_[a-z]{1,4}").prop_map(|(o, p)| format!("({o}).{p}")),
            ("m_[a-z]{1,4}", prop::collection::vec(inner.clone(), 0..3))
                .prop_map(|(m, args)| format!("v_obj.{m}({})", args.join(", "))),
            ("f_[a-z]{1,4}", prop::collection::vec(inner, 0..3))
                .prop_map(|(f, args)| format!("{f}({})", args.join(", "))),
        ]
    })
}

fn statement() -> impl Strategy<Value = String> {
    prop_oneof![
        ("v_[a-z]{1,4}", expression()).prop_map(|(name, e)| format!("{name} = {e}\n")),
        expression().prop_map(|e| format!("{e}\n")),
        (expression(), expression(), expression()).prop_map(|(c, a, b)| {
            format!("if {c}:\n    v_a = {a}\nelse if {b}:\n    return\nelse:\n    return {a}\n")
        }),
        (expression(), expression())
            .prop_map(|(iter, body)| format!("for v_i in {iter}:\n    v_t = {body}\n")),
        (expression()).prop_map(|body| format!("f_def(v_x, v_y):\n    return {body}\n")),
    ]
}

proptest! {
    #[test]
    fn rendering_reparses_to_the_same_tree(statements in prop::collection::vec(statement(), 1..4)) {
        let source = statements.concat();
        let program = compile(&source)
            .unwrap_or_else(|err| panic!("generated source failed: {err}\n{source}"));
        let rendered = program.to_string();
        let reparsed = compile(&rendered)
            .unwrap_or_else(|err| panic!("rendered source failed: {err}\n{rendered}"));
        prop_assert_eq!(&reparsed, &program);
        prop_assert_eq!(reparsed.to_string(), rendered);
    }

    #[test]
    fn roll_stays_within_dice_bounds(
        count in 1u32..20,
        sides in 1u32..100,
        modifier in -50i64..50,
        seed in any::<u64>(),
    ) {
        let sign = if modifier < 0 { "-" } else { "+" };
        let dice = format!("{count}d{sides}{sign}{}", modifier.abs());
        let program = compile(&format!("roll(\"{dice}\")")).unwrap();
        let value = Evaluator::with_seed(seed).eval(&program).unwrap();
        let Value::Number(total) = value else {
            panic!("roll returned {value:?}");
        };
        let low = count as f64 + modifier as f64;
        let high = (count as f64) * (sides as f64) + modifier as f64;
        prop_assert!(total >= low && total <= high, "{dice} rolled {total}");
        prop_assert_eq!(total.fract(), 0.0);
    }

    #[test]
    fn tokenizer_never_panics(source in "\\PC*") {
        let _ = tokenize(&source);
    }
}

//==============================================
// End of file
//==============================================

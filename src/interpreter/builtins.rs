//=====================================================
// File: interpreter/builtins.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Built-in functions available to every script
// Objective: Provide dice rolling, numeric helpers and the announce/log
//            output channels as native functions in the global scope
//=====================================================

use tracing::debug;

use super::Evaluator;
use super::dice::DiceExpr;
use super::environment::Environment;
use super::errors::RuntimeErrorKind;
use super::value::{NativeArity, NativeFunction, Value};

const BUILTINS: &[NativeFunction] = &[
    NativeFunction {
        name: "roll",
        arity: NativeArity::Exact(1),
        func: builtin_roll,
    },
    NativeFunction {
        name: "floor",
        arity: NativeArity::Exact(1),
        func: builtin_floor,
    },
    NativeFunction {
        name: "ceil",
        arity: NativeArity::Exact(1),
        func: builtin_ceil,
    },
    NativeFunction {
        name: "round",
        arity: NativeArity::Exact(1),
        func: builtin_round,
    },
    NativeFunction {
        name: "abs",
        arity: NativeArity::Exact(1),
        func: builtin_abs,
    },
    NativeFunction {
        name: "min",
        arity: NativeArity::AtLeast(1),
        func: builtin_min,
    },
    NativeFunction {
        name: "max",
        arity: NativeArity::AtLeast(1),
        func: builtin_max,
    },
    NativeFunction {
        name: "announce",
        arity: NativeArity::Exact(1),
        func: builtin_announce,
    },
    NativeFunction {
        name: "log",
        arity: NativeArity::AtLeast(0),
        func: builtin_log,
    },
];

/// Bind every builtin into `env`.
pub fn register_builtins(env: &mut Environment) {
    for native in BUILTINS {
        env.define(native.name, Value::Native(native.clone()));
    }
}

fn number_arg(function: &str, value: &Value) -> Result<f64, RuntimeErrorKind> {
    value.as_number().ok_or_else(|| {
        RuntimeErrorKind::TypeError(format!(
            "{}() expects a number, got {}",
            function,
            value.type_name()
        ))
    })
}

fn builtin_roll(evaluator: &mut Evaluator, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    let Value::String(text) = &args[0] else {
        return Err(RuntimeErrorKind::TypeError(format!(
            "roll() expects a dice string, got {}",
            args[0].type_name()
        )));
    };
    let dice: DiceExpr = text.parse()?;
    let total = dice.roll(evaluator.rng());
    debug!(%dice, total, "rolled dice");
    Ok(Value::Number(total as f64))
}

fn builtin_floor(_: &mut Evaluator, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    Ok(Value::Number(number_arg("floor", &args[0])?.floor()))
}

fn builtin_ceil(_: &mut Evaluator, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    Ok(Value::Number(number_arg("ceil", &args[0])?.ceil()))
}

// f64::round rounds half away from zero: round(2.5) == 3, round(-2.5) == -3.
fn builtin_round(_: &mut Evaluator, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    Ok(Value::Number(number_arg("round", &args[0])?.round()))
}

fn builtin_abs(_: &mut Evaluator, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    Ok(Value::Number(number_arg("abs", &args[0])?.abs()))
}

// A single array argument is spread, so min([3, 1]) works like min(3, 1).
fn numeric_operands(function: &str, args: &[Value]) -> Result<Vec<f64>, RuntimeErrorKind> {
    let values = match args {
        [Value::Array(array)] => array.snapshot(),
        _ => args.to_vec(),
    };
    if values.is_empty() {
        return Err(RuntimeErrorKind::ArgumentError(format!(
            "{}() needs at least one number",
            function
        )));
    }
    values.iter().map(|value| number_arg(function, value)).collect()
}

fn builtin_min(_: &mut Evaluator, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    let numbers = numeric_operands("min", args)?;
    Ok(Value::Number(numbers.into_iter().fold(f64::INFINITY, f64::min)))
}

fn builtin_max(_: &mut Evaluator, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    let numbers = numeric_operands("max", args)?;
    Ok(Value::Number(
        numbers.into_iter().fold(f64::NEG_INFINITY, f64::max),
    ))
}

fn builtin_announce(evaluator: &mut Evaluator, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    evaluator.push_announce(args[0].to_string());
    Ok(Value::Null)
}

fn builtin_log(evaluator: &mut Evaluator, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    evaluator.push_log(args.to_vec());
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Result<Value, RuntimeErrorKind> {
        let native = BUILTINS
            .iter()
            .find(|native| native.name == name)
            .unwrap();
        let mut evaluator = Evaluator::with_seed(11);
        (native.func)(&mut evaluator, args)
    }

    #[test]
    fn math_helpers() {
        assert_eq!(call("floor", &[2.7.into()]).unwrap(), Value::Number(2.0));
        assert_eq!(call("ceil", &[2.1.into()]).unwrap(), Value::Number(3.0));
        assert_eq!(call("round", &[3.5.into()]).unwrap(), Value::Number(4.0));
        assert_eq!(call("round", &[(-2.5).into()]).unwrap(), Value::Number(-3.0));
        assert_eq!(call("abs", &[(-5.0).into()]).unwrap(), Value::Number(5.0));
        assert_eq!(
            call("min", &[3.0.into(), 5.0.into(), 2.0.into()]).unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            call("max", &[Value::array(vec![3.0.into(), 9.0.into()])]).unwrap(),
            Value::Number(9.0)
        );
    }

    #[test]
    fn type_errors() {
        assert!(matches!(
            call("abs", &["x".into()]),
            Err(RuntimeErrorKind::TypeError(_))
        ));
        assert!(matches!(
            call("roll", &[6.0.into()]),
            Err(RuntimeErrorKind::TypeError(_))
        ));
        assert!(matches!(
            call("roll", &["two dice".into()]),
            Err(RuntimeErrorKind::ArgumentError(_))
        ));
    }

    #[test]
    fn roll_stays_in_range() {
        for _ in 0..50 {
            let Value::Number(n) = call("roll", &["2d6+4".into()]).unwrap() else {
                panic!("roll must produce a number");
            };
            assert!((6.0..=16.0).contains(&n));
            assert_eq!(n.fract(), 0.0);
        }
    }

    #[test]
    fn every_builtin_is_registered() {
        let mut env = Environment::default();
        register_builtins(&mut env);
        for native in BUILTINS {
            assert!(env.get(native.name).is_some_and(|v| v.is_callable()), "{}", native.name);
        }
    }
}

//=====================================================
// End of file
//=====================================================

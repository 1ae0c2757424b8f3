//! Built-in functions installed into a root environment.
//!
//! `write` and `print` emit one line per call to a shared sink; the math
//! functions take and return Numbers. `null` is bound to zero.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::env::Environment;
use crate::error::NativeError;
use crate::register_native;
use crate::value::Value;

/// Register every builtin in `env`. Output of `write`/`print` goes to
/// `sink`.
pub fn install<W: Write + 'static>(env: &Environment, sink: W) {
    let sink = Rc::new(RefCell::new(sink));

    let out = Rc::clone(&sink);
    register_native(env, "write", move |args| {
        let line = args
            .iter()
            .map(Value::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out.borrow_mut(), "{line}")?;
        Ok(None)
    });

    let out = sink;
    register_native(env, "print", move |args| {
        let line: String = args.iter().map(Value::to_string).collect();
        writeln!(out.borrow_mut(), "{line}")?;
        Ok(None)
    });

    unary_math(env, "sin", |x| Ok(x.sin()));
    unary_math(env, "cos", |x| Ok(x.cos()));
    unary_math(env, "tan", |x| Ok(x.tan()));
    unary_math(env, "ctg", |x| {
        let tan = x.tan();
        if tan == 0.0 {
            Err("cotangent is undefined where tangent is zero".to_string())
        } else {
            Ok(1.0 / tan)
        }
    });
    unary_math(env, "to_rad", |x| Ok(x.to_radians()));
    unary_math(env, "to_deg", |x| Ok(x.to_degrees()));
    unary_math(env, "sqrt", |x| {
        if x < 0.0 {
            Err("square root of a negative number".to_string())
        } else {
            Ok(x.sqrt())
        }
    });

    register_native(env, "pow", |args| {
        let (base, exponent) = match args {
            [base] => (number_arg("pow", base)?, 2.0),
            [base, exponent] => (number_arg("pow", base)?, number_arg("pow", exponent)?),
            _ => {
                return Err(NativeError::Arity {
                    name: "pow".into(),
                    expected: "1 or 2",
                    got: args.len(),
                })
            }
        };
        Ok(Some(Value::number(base.powf(exponent))))
    });

    env.set("null", Value::number(0.0));
}

/// Register a one-argument Number function. `Err` messages become
/// domain errors.
fn unary_math<F>(env: &Environment, name: &'static str, f: F)
where
    F: Fn(f64) -> Result<f64, String> + 'static,
{
    register_native(env, name, move |args| {
        let [arg] = args else {
            return Err(NativeError::Arity {
                name: name.into(),
                expected: "1",
                got: args.len(),
            });
        };
        let x = number_arg(name, arg)?;
        f(x).map(|y| Some(Value::number(y)))
            .map_err(|message| NativeError::Domain {
                name: name.into(),
                message,
            })
    });
}

fn number_arg(name: &str, value: &Value) -> Result<f64, NativeError> {
    value.as_number().ok_or_else(|| NativeError::ArgumentKind {
        name: name.into(),
        expected: "Number",
        got: value.type_name(),
    })
}

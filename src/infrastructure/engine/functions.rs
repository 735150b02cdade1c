use std::cmp::Ordering;

use crate::domain::entity::Value;
use crate::domain::query::AggregateFunction;

/// 集約関数を適用する。`values` にはNULLを含めない。
///
/// 空の入力に対して `count` は0、それ以外はNULLを返す。
pub fn aggregate(function: AggregateFunction, values: Vec<Value>) -> Value {
    match function {
        AggregateFunction::Count => Value::Integer(values.len() as i64),
        AggregateFunction::CountDistinct => {
            let mut distinct: Vec<Value> = Vec::with_capacity(values.len());
            for value in values {
                if !distinct.contains(&value) {
                    distinct.push(value);
                }
            }
            Value::Integer(distinct.len() as i64)
        }
        AggregateFunction::Sum => sum(&values),
        AggregateFunction::Avg => {
            if values.is_empty() {
                return Value::Null;
            }
            let total: f64 = values.iter().filter_map(as_f64).sum();
            Value::Float(total / values.len() as f64)
        }
        AggregateFunction::Max => extreme(values, Ordering::Greater),
        AggregateFunction::Min => extreme(values, Ordering::Less),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// 整数だけなら整数の和、浮動小数点数が混ざるか整数の範囲を超えれば浮動小数点数の和
fn sum(values: &[Value]) -> Value {
    if values.is_empty() {
        return Value::Null;
    }
    let integers = values.iter().try_fold(0_i64, |total, value| match value {
        Value::Integer(i) => total.checked_add(*i),
        _ => None,
    });
    match integers {
        Some(total) => Value::Integer(total),
        None => Value::Float(values.iter().filter_map(as_f64).sum()),
    }
}

fn extreme(values: Vec<Value>, wanted: Ordering) -> Value {
    values
        .into_iter()
        .reduce(|best, value| {
            if value.compare(&best) == Some(wanted) {
                value
            } else {
                best
            }
        })
        .unwrap_or(Value::Null)
}

/// SQL の LIKE 照合。`%` は任意の文字列、`_` は任意の1文字に一致する。
pub fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    // matched[j]: pattern[..i] が text[..j] に一致するか
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for symbol in &pattern {
        let mut next = vec![false; text.len() + 1];
        match symbol {
            '%' => {
                let mut any = false;
                for j in 0..=text.len() {
                    any = any || matched[j];
                    next[j] = any;
                }
            }
            '_' => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            c => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == *c;
                }
            }
        }
        matched = next;
    }
    matched[text.len()]
}

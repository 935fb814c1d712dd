use std::cmp::Ordering;

use micro_api::{Direction, DocId, FieldUpdate, Filter, Query};
use serde_json::Value;

/// Dotted field paths reach into nested objects
pub fn field<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |v, k| v.get(k))
}

fn field_mut<'a>(data: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut cur = data;
    for k in path.split('.') {
        if !cur.is_object() {
            *cur = Value::Object(serde_json::Map::new());
        }
        cur = cur.as_object_mut()?.entry(k).or_insert(Value::Null);
    }
    Some(cur)
}

pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn same(a: &Value, b: &Value) -> bool {
    match compare(a, b) {
        Some(o) => o == Ordering::Equal,
        None => a == b,
    }
}

pub fn matches(filter: &Filter, id: &DocId, data: &Value) -> bool {
    match filter {
        Filter::Eq { field: f, value } => field(data, f).map_or(false, |v| same(v, value)),
        Filter::Gte { field: f, value } => field(data, f)
            .and_then(|v| compare(v, value))
            .map_or(false, |o| o != Ordering::Less),
        Filter::ArrayContains { field: f, value } => field(data, f)
            .and_then(|v| v.as_array())
            .map_or(false, |a| a.iter().any(|v| same(v, value))),
        Filter::IdIn(ids) => ids.contains(id),
    }
}

/// Runs `query` over `docs`, given in creation order
pub fn run<'a, I>(query: &Query, docs: I) -> Vec<(&'a DocId, &'a Value)>
where
    I: IntoIterator<Item = (&'a DocId, &'a Value)>,
{
    let mut res = docs
        .into_iter()
        .filter(|(id, data)| query.filters.iter().all(|f| matches(f, id, data)))
        .collect::<Vec<_>>();
    if let Some(order) = &query.order_by {
        // documents missing the ordering field are not part of an ordered query
        res.retain(|(_, data)| field(data, &order.field).is_some());
        res.sort_by(|(_, a), (_, b)| {
            let o = match (field(a, &order.field), field(b, &order.field)) {
                (Some(a), Some(b)) => compare(a, b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            };
            match order.direction {
                Direction::Asc => o,
                Direction::Desc => o.reverse(),
            }
        });
    }
    if let Some(limit) = query.limit {
        res.truncate(limit);
    }
    res
}

pub fn apply(data: &mut Value, update: &FieldUpdate) {
    let Some(target) = field_mut(data, update.field()) else {
        return;
    };
    match update {
        FieldUpdate::Set { value, .. } => *target = value.clone(),
        FieldUpdate::Increment { by, .. } => {
            *target = match target.as_i64() {
                Some(n) => Value::from(n + by),
                None => match target.as_f64() {
                    Some(n) => Value::from(n + *by as f64),
                    None => Value::from(*by),
                },
            }
        }
        FieldUpdate::ArrayUnion { values, .. } => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            if let Some(arr) = target.as_array_mut() {
                for v in values {
                    if !arr.iter().any(|a| same(a, v)) {
                        arr.push(v.clone());
                    }
                }
            }
        }
        FieldUpdate::ArrayRemove { values, .. } => match target.as_array_mut() {
            Some(arr) => arr.retain(|a| !values.iter().any(|v| same(a, v))),
            None => *target = Value::Array(Vec::new()),
        },
    }
}

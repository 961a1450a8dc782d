use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{CmpOp, Filter, MAX_IN_SET, MAX_PATH_DEPTH, MAX_SORT_FIELDS, Order, SortSpec};

pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path).is_some_and(|v| matches_set(v, values)),
        Filter::Nin { path, values } => !get_path(doc, path).is_some_and(|v| matches_set(v, values)),
        Filter::Cmp { path, op, value } => {
            let Some(v) = get_path(doc, path) else {
                return false;
            };
            match op {
                CmpOp::Eq => match v {
                    Bson::Array(items) if !matches!(value, Bson::Array(_)) => {
                        items.iter().any(|x| bson_equal(x, value))
                    }
                    _ => bson_equal(v, value),
                },
                CmpOp::Gt => comparable(v, value) && compare_bson(v, value) == Ordering::Greater,
                CmpOp::Gte => comparable(v, value) && compare_bson(v, value) != Ordering::Less,
                CmpOp::Lt => comparable(v, value) && compare_bson(v, value) == Ordering::Less,
                CmpOp::Lte => comparable(v, value) && compare_bson(v, value) != Ordering::Greater,
            }
        }
        Filter::Range { path, gte, lte } => {
            let Some(v) = get_path(doc, path) else {
                return false;
            };
            let lower_ok = gte
                .as_ref()
                .is_none_or(|lo| comparable(v, lo) && compare_bson(v, lo) != Ordering::Less);
            let upper_ok = lte
                .as_ref()
                .is_none_or(|hi| comparable(v, hi) && compare_bson(v, hi) != Ordering::Greater);
            lower_ok && upper_ok
        }
        Filter::Regex { path, regex } => match get_path(doc, path) {
            Some(Bson::String(s)) => regex.is_match(s),
            Some(Bson::Array(items)) => items.iter().any(|x| matches!(x, Bson::String(s) if regex.is_match(s))),
            _ => false,
        },
        Filter::ElemMatch { path, filter } => match get_path(doc, path) {
            Some(Bson::Array(items)) => {
                items.iter().any(|x| matches!(x, Bson::Document(d) if eval_filter(d, filter)))
            }
            _ => false,
        },
    }
}

pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let ord = match (get_path(a, &s.field), get_path(b, &s.field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

/// An array value matches a set when any of its elements does.
fn matches_set(v: &Bson, set: &[Bson]) -> bool {
    match v {
        Bson::Array(items) => items.iter().any(|x| is_in_set(x, set)),
        _ => is_in_set(v, set),
    }
}

fn is_in_set(v: &Bson, set: &[Bson]) -> bool {
    set.iter().take(MAX_IN_SET).any(|x| bson_equal(x, v))
}

/// Equality that treats the numeric types as one domain.
fn bson_equal(a: &Bson, b: &Bson) -> bool {
    if is_num(a) && is_num(b) {
        return as_f64_num(a) == as_f64_num(b);
    }
    a == b
}

/// Range operators only apply within the same type bracket.
fn comparable(a: &Bson, b: &Bson) -> bool {
    (is_num(a) && is_num(b)) || type_rank(a) == type_rank(b)
}

pub(crate) fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut cur = doc;
    let mut parts = path.split('.').peekable();
    let mut segs = 0usize;
    while let Some(part) = parts.next() {
        segs += 1;
        if segs > MAX_PATH_DEPTH {
            return None;
        }
        let v = cur.get(part)?;
        if parts.peek().is_none() {
            return Some(v);
        }
        match v {
            Bson::Document(d) => cur = d,
            _ => return None,
        }
    }
    None
}

fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

#[allow(clippy::cast_precision_loss)]
fn as_f64_num(x: &Bson) -> f64 {
    match x {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        Bson::Decimal128(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b));
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::Null => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 5,
        Bson::Document(_) => 7,
        Bson::Array(_) => 8,
        Bson::Binary(_) => 9,
        Bson::ObjectId(_) => 10,
        Bson::Boolean(_) => 11,
        Bson::DateTime(_) => 12,
        Bson::Timestamp(_) => 13,
        Bson::RegularExpression(_) => 14,
        Bson::MaxKey => 250,
        Bson::MinKey => 251,
        _ => 200,
    }
}

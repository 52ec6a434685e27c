//! Collection Package
//!
//! Searching, filtering, sorting and random sampling of collections.
//! Results are always plain sequences; keyed entries of the input keep
//! their values but lose their keys.

use rand::seq::SliceRandom;
use rand::Rng;

use super::string::{item_count, natural_cmp, sort_chars};
use crate::errors::ScriptError;
use crate::values::{NativeFunction, Value};
use crate::vm::Context;

// ============================================================================
// Searching
// ============================================================================

/// Zero based position of `of` in `in`, or -1 when it does not occur.
///
/// When `in` is a string this is a substring search, counting characters.
fn position(ctx: &mut Context) -> Result<Value, ScriptError> {
    let of = ctx.param::<Value>("of")?.into_result()?;
    let within = ctx.param::<Value>("in")?.into_result()?;

    if matches!(within, Value::String(_)) {
        let needle = of.to_string()?;
        let haystack = within.to_string()?;
        let position = haystack
            .find(needle.as_str())
            .map_or(-1, |byte| haystack[..byte].chars().count() as i64);
        return Ok(Value::Int(position));
    }

    let position = within
        .to_vec()?
        .iter()
        .position(|item| item.equal(&of))
        .map_or(-1, |i| i as i64);
    Ok(Value::Int(position))
}

fn number_of_items(ctx: &mut Context) -> Result<Value, ScriptError> {
    item_count(&ctx.param::<Value>("in")?)
}

// ============================================================================
// Filtering & Sorting
// ============================================================================

/// Items for which `filter`, called with the item as `input`, is true.
pub(crate) fn filter_list(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = ctx.input()?;
    let filter: Value = ctx.param("filter")?;
    let mut kept = Vec::new();
    for item in input.to_vec()? {
        if ctx.call_with_input(&filter, item.clone())?.to_bool()? {
            kept.push(item);
        }
    }
    Ok(Value::list(kept))
}

/// Sort by the text of `order_by(input: item)` in natural order. A string
/// input sorts its characters.
fn sort_list(ctx: &mut Context) -> Result<Value, ScriptError> {
    let input = ctx.input()?.into_result()?;
    let order_by: Value = ctx.param_or("order_by", Value::Nil)?;
    let remove_duplicates: bool = ctx.param_or("remove_duplicates", false)?;

    if let Value::String(text) = &input {
        let mut sorted = sort_chars(text, None);
        if remove_duplicates {
            let mut chars: Vec<char> = sorted.chars().collect();
            chars.dedup();
            sorted = chars.into_iter().collect();
        }
        return Ok(Value::string(sorted));
    }

    let mut keyed = Vec::new();
    for item in input.to_vec()? {
        // A nil `order_by` calls through to the item itself.
        let key = ctx.call_with_input(&order_by, item.clone())?.to_string()?;
        keyed.push((key, item));
    }
    keyed.sort_by(|(a, _), (b, _)| natural_cmp(a, b));
    if remove_duplicates {
        keyed.dedup_by(|(a, _), (b, _)| natural_cmp(a, b).is_eq());
    }
    Ok(Value::list(keyed.into_iter().map(|(_, item)| item)))
}

// ============================================================================
// Randomness
// ============================================================================

fn random_shuffle(ctx: &mut Context) -> Result<Value, ScriptError> {
    let mut items = ctx.input()?.to_vec()?;
    items.shuffle(&mut rand::thread_rng());
    Ok(Value::list(items))
}

fn random_select(ctx: &mut Context) -> Result<Value, ScriptError> {
    let items = ctx.input()?.to_vec()?;
    items
        .choose(&mut rand::thread_rng())
        .cloned()
        .ok_or_else(|| ScriptError::custom("Can not select a random item from an empty collection"))
}

/// `count` random items, each at most once unless `replace` is set.
fn random_select_many(ctx: &mut Context) -> Result<Value, ScriptError> {
    let mut items = ctx.input()?.to_vec()?;
    let count: i64 = ctx.param("count")?;
    let count = usize::try_from(count)
        .map_err(|_| ScriptError::custom(format!("Can not select {count} items")))?;
    // A function value is the `replace` builtin leaking in, not a flag.
    let replace = match ctx.param_opt::<Value>("replace")? {
        Some(value) if !value.is_function() => value.to_bool()?,
        _ => false,
    };

    let mut rng = rand::thread_rng();
    if replace {
        if items.is_empty() && count > 0 {
            return Err(ScriptError::custom(format!(
                "Can not select {count} items from an empty collection"
            )));
        }
        let picked = (0..count).map(|_| items[rng.gen_range(0..items.len())].clone());
        return Ok(Value::list(picked.collect::<Vec<_>>()));
    }

    if count > items.len() {
        return Err(ScriptError::custom(format!(
            "Can not select {count} items from a collection containing only {} items",
            items.len()
        )));
    }
    items.shuffle(&mut rng);
    items.truncate(count);
    Ok(Value::list(items))
}

/// Register the collection builtins. `length` lives in the string package.
pub fn register(ctx: &mut Context) {
    ctx.register_builtin(NativeFunction::new("position", position));
    ctx.register_builtin(NativeFunction::new("number_of_items", number_of_items));
    ctx.register_builtin(NativeFunction::new("filter_list", filter_list));
    ctx.register_builtin(NativeFunction::new("sort_list", sort_list));
    ctx.register_builtin(NativeFunction::new("random_shuffle", random_shuffle));
    ctx.register_builtin(NativeFunction::new("random_select", random_select));
    ctx.register_builtin(NativeFunction::new("random_select_many", random_select_many));
}

#[cfg(test)]
#[path = "collection_test.rs"]
mod collection_test;

//! Host objects.
//!
//! Hosts expose their own data (cards, sets, stylesheets) to scripts by
//! implementing [`ScriptObject`]. Every method has a default, so an object
//! only overrides what it supports.

use core::any::Any;

use ecow::{EcoString, eco_format};

use super::Value;
use crate::errors::ScriptError;
use crate::vm::{Context, Dependency};

pub trait ScriptObject: Send + Sync + 'static {
    fn type_name(&self) -> &'static str;

    /// `object.name` or `object["name"]`.
    fn get_member(&self, name: &str) -> Value {
        Value::delayed_error(ScriptError::NoSuchMember {
            type_name: self.type_name(),
            member: name.into(),
        })
    }

    /// Member access during dependency analysis. Objects that can change
    /// record `dep` here so the host can invalidate cached results.
    fn dependency_member(&self, _name: &str, _dep: &Dependency) -> Value {
        Value::dependency_dummy()
    }

    fn make_iterator(&self) -> Value {
        Value::delayed_error(ScriptError::conversion(self.type_name(), "collection"))
    }

    fn item_count(&self) -> Option<usize> {
        None
    }

    fn to_string(&self) -> Result<EcoString, ScriptError> {
        Err(ScriptError::conversion(self.type_name(), "string"))
    }

    fn to_code(&self) -> EcoString {
        eco_format!("<{}>", self.type_name())
    }

    /// Invoke the object as a function.
    fn call(&self, _ctx: &mut Context) -> Result<Value, ScriptError> {
        Ok(Value::delayed_error(ScriptError::conversion(
            self.type_name(),
            "function",
        )))
    }

    /// Abstract counterpart of [`call`](Self::call) used by dependency analysis.
    fn dependencies(&self, _ctx: &mut Context, _dep: &Dependency) -> Result<Value, ScriptError> {
        Ok(Value::dependency_dummy())
    }

    fn as_any(&self) -> &dyn Any;
}

pub mod collection;
pub mod color;
pub mod conversion;
pub mod function;
pub mod iterator;
pub mod object;
pub mod value;

pub use collection::Collection;
pub use color::Color;
pub use conversion::FromValue;
pub use function::{Closure, DependencyFn, Function, NativeFn, NativeFunction};
pub use iterator::{CollectionIter, IterStep, RangeIter, ScriptIterator, ValueIterator};
pub use object::ScriptObject;
pub use value::{ImageHandle, Value, approx_equal, format_double, parse_datetime, quote_string};

pub mod codec;
pub mod definition;
pub mod multikey;
pub mod range;


pub use codec::IndexKey;
pub use definition::{DefinitionError, IndexDefinition, IndexField, IndexOptions, IndexStatus};
pub use multikey::derive_binary_keys;
pub use range::{FieldRange, IndexRange, RangeError, ScanBounds};

pub mod audit;
pub mod document;
pub mod enums;
pub mod field;
pub mod filters;
pub mod invoice;
pub mod party;
pub mod report;

pub use audit::*;
pub use document::*;
pub use enums::*;
pub use field::*;
pub use filters::*;
pub use invoice::*;
pub use party::*;
pub use report::*;

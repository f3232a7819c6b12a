pub mod commit;
pub mod constraint;
pub mod container;
pub mod database;
pub mod error;
pub mod field;
pub mod files;
pub mod table;

pub use commit::CommitService;
pub use container::{Container, Entry};
pub use database::{Database, DatabaseBuilder, DatabaseLoader};
pub use error::{Result, ShaleDbError};
pub use field::{Field, FieldType};
pub use table::{Table, TableBuilder, TableLoader};

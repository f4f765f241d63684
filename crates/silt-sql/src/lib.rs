//! siltdb's SQL engine.
//!
//! The engine compiles each SQL statement into a linear stream of
//! operators running inside a transaction. Rows are objects; tables and
//! secondary indexes are both trees over a single ordered key-value
//! namespace space, and range predicates collapse to byte intervals
//! through the order-preserving key codec.
//!
//! ```no_run
//! use silt_sql::Db;
//!
//! let db = Db::open(":memory:")?;
//! db.exec("CREATE TABLE user (id INT PRIMARY KEY, name TEXT)")?;
//! db.exec("INSERT INTO user (id, name) VALUES (1, 'ada')")?;
//! let result = db.query("SELECT name FROM user WHERE id = 1")?;
//! for row in result.to_json() {
//!     println!("{row}");
//! }
//! # Ok::<(), silt_sql::Error>(())
//! ```

pub mod catalog;
pub mod codec;
pub mod environment;
mod error;
pub mod expr;
pub mod object;
pub mod parser;
pub mod planner;
pub mod stream;
pub mod table;
pub mod tree;
pub mod value;

mod executor;
mod session;

pub use environment::Param;
pub use error::{Error, Result};
pub use executor::ResultSet;
pub use object::{Object, Path};
pub use session::{Db, Statement, Tx};
pub use value::{Value, ValueKind};

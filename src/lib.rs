pub mod catalog;
pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod highlight;
pub mod recent;
pub mod search;
pub mod selection;
pub mod session;

pub use catalog::{Catalog, Item};
pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use recent::{RecencyCache, RecencyHandle};
pub use selection::{SelectedItem, Selection, Totals};
pub use session::{CalculatorSession, Edit};

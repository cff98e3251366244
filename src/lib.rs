//! Extract the reading illustrations embedded in `Lecturas *.docx` files
//! into one folder per date and rebuild the `lecturas.json` index.

pub mod archive;
pub mod args;
pub mod filename;
pub mod processor;
pub mod record;

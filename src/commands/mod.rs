// Batch file commands
pub mod list;
pub mod run;
pub mod validate;

// Ad-hoc merge
pub mod merge;

pub mod filenames;
pub mod logging;

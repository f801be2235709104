pub mod link_loader;

pub use link_loader::load_links;

pub mod cache_info;
pub mod fetch;
pub mod inspect;
pub mod list_targets;
pub mod view;

pub use cache_info::show_cache;
pub use fetch::fetch;
pub use inspect::inspect;
pub use list_targets::list_targets;
pub use view::view;

pub mod inspect;
pub mod link;
pub mod traits;

pub use inspect::{run_inspect, InspectArgs};
pub use link::{run_link, LinkArgs};

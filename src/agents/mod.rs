pub mod min;
pub mod policy;
pub mod random;
pub mod registry;

pub use min::MinAgent;
pub use policy::PolicyAgent;
pub use random::RandomAgent;
pub use registry::{create_agent_from_spec, label_for_spec};

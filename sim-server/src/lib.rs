pub use sim_config::{default_world_config_path, load_default_world_config, load_world_config};

pub mod protocol;

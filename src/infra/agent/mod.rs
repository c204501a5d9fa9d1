pub mod timeweb_client;

pub use timeweb_client::TimewebAgentClient;

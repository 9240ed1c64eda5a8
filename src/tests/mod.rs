pub mod test_agent;
pub mod test_edge_cases;
pub mod test_replay_buffer;

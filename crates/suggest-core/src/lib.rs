pub mod automaton;
pub mod bucketed;
pub mod exact;
pub mod lookup;
pub mod settings;
pub mod sort;
pub mod store;

mod inheritance;

pub use inheritance::InheritanceGraph;

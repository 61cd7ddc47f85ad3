pub mod data;
pub mod managersystem;
pub mod operationsystem;
pub mod paver;
pub mod scout;

pub mod body;
pub mod data;
pub mod headcount;
pub mod medic;
pub mod missionsystem;
pub mod paver;
pub mod paving;
pub mod scout;

pub mod costmatrix;
pub mod costmatrixsystem;
pub mod movementsystem;
pub mod route;
pub mod routecachesystem;
pub mod search;

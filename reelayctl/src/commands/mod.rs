pub mod doctor;
pub mod ops;
pub mod run;

pub mod alias;
pub mod bagging;
pub mod gaussian_nb;

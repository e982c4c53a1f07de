pub mod branch;
pub mod hexagram;
pub mod situation;
pub mod trigram;

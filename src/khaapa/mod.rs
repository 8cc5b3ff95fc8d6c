pub mod insights;

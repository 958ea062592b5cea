pub mod end_point;

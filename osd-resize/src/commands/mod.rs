pub mod resize_control_plane;
pub mod resize_infra;

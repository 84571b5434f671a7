mod box_filter;
pub mod cpu_box_blurrer;

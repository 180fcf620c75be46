pub mod filter_form;
pub mod notice;
pub mod pane_chrome;
pub mod scrollable_list;
pub mod status_bar;
pub mod toast;

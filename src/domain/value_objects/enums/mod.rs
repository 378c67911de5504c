pub mod booking_sort_keys;
pub mod booking_statuses;
pub mod sort_order;

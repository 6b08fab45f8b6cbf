mod common;

mod bookings;

pub mod socket_guard;

pub mod cutout_server;

pub mod audio_driver;
pub mod plot_surface;

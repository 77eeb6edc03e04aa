use std::fs;
use std::path::PathBuf;

use tsgl::config::{DEFAULT_FPS, DEFAULT_WIDTH};
use tsgl::{CanvasConfig, CanvasError, Color};

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tsgl-config-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn missing_file_is_created_with_defaults() {
    let dir = scratch("missing");
    let path = dir.join("nested").join("config.toml");

    let config = CanvasConfig::load_from_path(&path).unwrap();
    assert_eq!(config, CanvasConfig::default());
    assert!(path.exists());

    let settings = config.settings();
    assert_eq!(settings.width, DEFAULT_WIDTH);
    assert_eq!(settings.fps, DEFAULT_FPS);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn saved_config_loads_back() {
    let dir = scratch("roundtrip");
    let path = dir.join("config.toml");
    let mut config = CanvasConfig::default();
    config.fps = Some(24);
    config.background_color = Some([0, 0, 255, 255]);
    config.window.title = Some("mandelbrot".into());
    config.screenshot_dir = Some(dir.join("shots"));

    config.save_to_path(&path).unwrap();
    let loaded = CanvasConfig::load_from_path(&path).unwrap();
    assert_eq!(loaded, config);

    let settings = loaded.settings();
    assert_eq!(settings.background_color, Color::BLUE);
    assert_eq!(settings.title, "mandelbrot");
    assert_eq!(settings.screenshot_dir, dir.join("shots"));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn malformed_file_is_a_parse_error() {
    let dir = scratch("malformed");
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    fs::write(&path, "[window\nwidth = 3").unwrap();
    assert!(matches!(
        CanvasConfig::load_from_path(&path),
        Err(CanvasError::ConfigParse(_))
    ));
    fs::remove_dir_all(&dir).unwrap();
}

//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Spatial Safari Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[target]
application = "Safari"

[scheduler]
# interval_ms = 1000          # 100-60000, time between arrangement cycles
# collect_timeout_ms = 2000   # 50-30000, budget for reading all windows
# write_timeout_ms = 1500     # 50-30000, budget for one window write

[retry]
# base_delay_ms = 250         # 10-10000, first retry delay (doubles per failure)
# max_delay_ms = 8000         # 10-300000, retry delay cap
# max_attempts = 5            # 1-20, failures before a window is left alone

[apply]
# max_concurrent_writes = 4   # 1-16
# max_concurrent_reads = 4    # 1-16
# epsilon = 2.0               # 0.0-50.0 points, geometry treated as converged

[layout]
# policy = "grid-spatial"
# edge_margin = 0             # 0-200 points
# gutter = 0                  # 0-100 points
# raise_on_arrange = false    # bring windows to front in arrangement order
# manage_floating = false     # also arrange floating windows

[logging]
# level = "INFO"              # TRACE, DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}

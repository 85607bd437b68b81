//! INFO Sections
//!
//! Each section is a fixed, ordered list of `(label, accessor)` pairs. The
//! accessors read from the [`Context`] and always produce a string, so
//! rendering cannot fail once a section is found.
//!
//! ```text
//! INFO replication          INFO
//! ─────────────────         ─────────────────
//! role:master               # Server
//! connected_slaves:0        redis_version:0.1.0
//! master_replid:8f1c...     ...
//! ...                       (blank line)
//!                           # Clients
//!                           ...
//! ```

use crate::commands::CommandError;
use crate::server::Context;
use std::sync::atomic::Ordering;

/// One `label:value` line.
struct InfoField {
    label: &'static str,
    value: fn(&Context) -> String,
}

struct InfoSection {
    name: &'static str,
    title: &'static str,
    fields: &'static [InfoField],
}

static SERVER: InfoSection = InfoSection {
    name: "server",
    title: "Server",
    fields: &[
        InfoField {
            label: "redis_version",
            value: |_| crate::VERSION.to_string(),
        },
        InfoField {
            label: "redis_mode",
            value: |_| "standalone".to_string(),
        },
        InfoField {
            label: "process_id",
            value: |_| std::process::id().to_string(),
        },
        InfoField {
            label: "tcp_port",
            value: |ctx| ctx.server().port.to_string(),
        },
        InfoField {
            label: "uptime_in_seconds",
            value: |ctx| ctx.server().uptime_secs().to_string(),
        },
    ],
};

static CLIENTS: InfoSection = InfoSection {
    name: "clients",
    title: "Clients",
    fields: &[
        InfoField {
            label: "connected_clients",
            value: |ctx| ctx.stats().active_connections.load(Ordering::Relaxed).to_string(),
        },
        InfoField {
            label: "total_connections_received",
            value: |ctx| ctx.stats().connections_accepted.load(Ordering::Relaxed).to_string(),
        },
        InfoField {
            label: "total_commands_processed",
            value: |ctx| ctx.stats().commands_processed.load(Ordering::Relaxed).to_string(),
        },
        InfoField {
            label: "total_net_input_bytes",
            value: |ctx| ctx.stats().bytes_read.load(Ordering::Relaxed).to_string(),
        },
        InfoField {
            label: "total_net_output_bytes",
            value: |ctx| ctx.stats().bytes_written.load(Ordering::Relaxed).to_string(),
        },
    ],
};

static STATS: InfoSection = InfoSection {
    name: "stats",
    title: "Stats",
    fields: &[
        InfoField {
            label: "stored_keys",
            value: |ctx| ctx.store().stats().keys.to_string(),
        },
        InfoField {
            label: "total_get_ops",
            value: |ctx| ctx.store().stats().get_ops.to_string(),
        },
        InfoField {
            label: "total_set_ops",
            value: |ctx| ctx.store().stats().set_ops.to_string(),
        },
    ],
};

static REPLICATION: InfoSection = InfoSection {
    name: "replication",
    title: "Replication",
    fields: &[
        InfoField {
            label: "role",
            value: |ctx| ctx.replication().role.as_str().to_string(),
        },
        InfoField {
            label: "connected_slaves",
            value: |_| "0".to_string(),
        },
        InfoField {
            label: "master_replid",
            value: |ctx| ctx.replication().master_replid.clone(),
        },
        InfoField {
            label: "master_replid2",
            value: |_| "0".repeat(40),
        },
        InfoField {
            label: "master_repl_offset",
            value: |ctx| ctx.replication().master_repl_offset.to_string(),
        },
        InfoField {
            label: "second_repl_offset",
            value: |_| "-1".to_string(),
        },
        InfoField {
            label: "repl_backlog_active",
            value: |_| "0".to_string(),
        },
        InfoField {
            label: "repl_backlog_size",
            value: |_| "1048576".to_string(),
        },
        InfoField {
            label: "repl_backlog_first_byte_offset",
            value: |_| "0".to_string(),
        },
        InfoField {
            label: "repl_backlog_histlen",
            value: |_| "0".to_string(),
        },
    ],
};

static SECTIONS: [&InfoSection; 4] = [&SERVER, &CLIENTS, &STATS, &REPLICATION];

impl InfoSection {
    fn render(&self, ctx: &Context) -> String {
        self.fields
            .iter()
            .map(|field| format!("{}:{}", field.label, (field.value)(ctx)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Renders one section by name (case-insensitive), or every section with
/// `# Title` headers when `section` is `None`.
pub fn render(ctx: &Context, section: Option<&str>) -> Result<String, CommandError> {
    match section {
        Some(name) => SECTIONS
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .map(|s| s.render(ctx))
            .ok_or(CommandError::InvalidArgument),
        None => Ok(SECTIONS
            .iter()
            .map(|s| format!("# {}\n{}", s.title, s.render(ctx)))
            .collect::<Vec<_>>()
            .join("\n\n")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionStats;
    use crate::server::{ReplicationInfo, ServerInfo};
    use crate::storage::StorageEngine;
    use std::sync::Arc;

    fn lines(text: &str) -> Vec<(&str, &str)> {
        text.lines().filter_map(|l| l.split_once(':')).collect()
    }

    #[test]
    fn test_replication_section_order() {
        let ctx = Context::with_store(Arc::new(StorageEngine::new()));
        let text = render(&ctx, Some("replication")).unwrap();
        let labels: Vec<_> = lines(&text).into_iter().map(|(l, _)| l).collect();

        assert_eq!(
            labels,
            vec![
                "role",
                "connected_slaves",
                "master_replid",
                "master_replid2",
                "master_repl_offset",
                "second_repl_offset",
                "repl_backlog_active",
                "repl_backlog_size",
                "repl_backlog_first_byte_offset",
                "repl_backlog_histlen",
            ]
        );
        assert!(!text.ends_with('\n'));
        let replid2 = "0".repeat(40);
        assert!(lines(&text).contains(&("master_replid2", replid2.as_str())));
    }

    #[test]
    fn test_follower_role() {
        let ctx = Context::new(
            Arc::new(StorageEngine::new()),
            ServerInfo::new(6380),
            ReplicationInfo::from_replicaof(Some("localhost 6379")).unwrap(),
            Arc::new(ConnectionStats::new()),
        );
        let text = render(&ctx, Some("REPLICATION")).unwrap();
        assert!(text.starts_with("role:slave\n"));

        let server = render(&ctx, Some("server")).unwrap();
        assert!(lines(&server).contains(&("tcp_port", "6380")));
    }

    #[test]
    fn test_clients_section_reads_stats() {
        let stats = Arc::new(ConnectionStats::new());
        stats.connection_opened();
        stats.command_processed();
        let ctx = Context::new(
            Arc::new(StorageEngine::new()),
            ServerInfo::new(6379),
            ReplicationInfo::leader(),
            Arc::clone(&stats),
        );

        let text = render(&ctx, Some("clients")).unwrap();
        let fields = lines(&text);
        assert!(fields.contains(&("connected_clients", "1")));
        assert!(fields.contains(&("total_commands_processed", "1")));
    }

    #[test]
    fn test_stats_section_reads_store() {
        let store = Arc::new(StorageEngine::new());
        store.set(bytes::Bytes::from("a"), crate::storage::Value::string("1"));
        store.get(b"a");
        let ctx = Context::with_store(store);

        let text = render(&ctx, Some("stats")).unwrap();
        assert_eq!(text, "stored_keys:1\ntotal_get_ops:1\ntotal_set_ops:1");
    }

    #[test]
    fn test_all_sections() {
        let ctx = Context::with_store(Arc::new(StorageEngine::new()));
        let text = render(&ctx, None).unwrap();

        assert!(text.starts_with("# Server\n"));
        assert!(text.contains("\n\n# Clients\n"));
        assert!(text.contains("\n\n# Stats\n"));
        assert!(text.contains("\n\n# Replication\nrole:master\n"));
    }

    #[test]
    fn test_unknown_section() {
        let ctx = Context::with_store(Arc::new(StorageEngine::new()));
        assert_eq!(
            render(&ctx, Some("keyspace")),
            Err(CommandError::InvalidArgument)
        );
    }
}

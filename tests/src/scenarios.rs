use std::collections::BTreeSet;
use std::path::PathBuf;

use proxmap_common::config::Config;
use proxmap_common::error::InventoryError;
use proxmap_common::proxy::edge::ServerKind;
use proxmap_common::proxy::target::Target;
use proxmap_core::inventory::InventoryService;
use proxmap_core::report;

use crate::support::{Fixture, ScriptedHost};

#[tokio::test]
async fn nginx_target_served_by_unit() {
    let fixture = Fixture::new().nginx(
        "example.com",
        "server {\n    listen 80;\n    server_name example.com;\n    location / {\n        proxy_pass http://127.0.0.1:8080;\n    }\n}\n",
    );
    let host = ScriptedHost::new()
        .listening(8080, 1234, "gunicorn")
        .unit(1234, "app.service");

    let (inventory, resolution) = fixture.service(host).run().await.unwrap();
    let target = Target::network("127.0.0.1", 8080);

    let record = resolution.get(&target).unwrap();
    assert_eq!(record.systemd_unit.as_deref(), Some("app.service"));
    assert_eq!(inventory.domains_for(&target), BTreeSet::from(["example.com"]));

    let text = report::render(&inventory, &resolution);
    assert!(text.contains("[1] 127.0.0.1:8080\n"));
    assert!(text.contains("domains..: example.com"));
    assert!(text.contains("unit.....: app.service"));
}

#[tokio::test]
async fn apache_socket_resolved_through_socket_lookup() {
    let fixture = Fixture::new().apache(
        "app.conf",
        "<VirtualHost *:80>\n    ServerName app.example\n    ProxyPass /app unix:/var/run/app.sock|cgi-script\n</VirtualHost>\n",
    );
    let host = ScriptedHost::new().holding_socket("/var/run/app.sock", 77, "uwsgi");
    let queries = host.query_log();

    let (inventory, resolution) = fixture.service(host).run().await.unwrap();
    let target = Target::socket("/var/run/app.sock");

    assert_eq!(inventory.targets(), vec![target.clone()]);
    assert_eq!(resolution.get(&target).unwrap().processes[0].pid, 77);
    assert!(queries
        .lock()
        .unwrap()
        .contains(&"socket /var/run/app.sock".to_string()));

    let text = report::render(&inventory, &resolution);
    assert!(text.contains("[1] unix:/var/run/app.sock\n"));
    assert!(text.contains("processes: uwsgi (77)"));
    assert!(text.contains("unit.....: unmanaged"));
}

#[tokio::test]
async fn nginx_to_apache_chain_ends_unresolved() {
    let fixture = Fixture::new()
        .nginx(
            "shop",
            "server {\n  server_name shop.example;\n  location / { proxy_pass http://127.0.0.1:9000; }\n}\n",
        )
        .apache(
            "shop.conf",
            "Listen 9000\n<VirtualHost 127.0.0.1:9000>\n  ServerName shop.example\n  ProxyPass / http://127.0.0.1:9100/\n</VirtualHost>\n",
        );
    let host = ScriptedHost::new()
        .listening(9000, 812, "apache2")
        .listening(9000, 813, "apache2")
        .unit(812, "apache2.service")
        .unit(813, "apache2.service");

    let (inventory, resolution) = fixture.service(host).run().await.unwrap();

    let front = resolution.get(&Target::network("127.0.0.1", 9000)).unwrap();
    assert_eq!(front.proxies_to, vec![Target::network("127.0.0.1", 9100)]);
    assert!(!resolution.get(&Target::network("127.0.0.1", 9100)).unwrap().is_resolved());

    let text = report::render(&inventory, &resolution);
    assert!(text.contains("  127.0.0.1:9000 (apache2.service) -> 127.0.0.1:9100 (unresolved)\n"));
    assert!(text.contains("    └─ 127.0.0.1:9100\n"));
    assert!(!text.contains("[2]"));
}

#[tokio::test]
async fn shared_target_combines_domains() {
    let fixture = Fixture::new()
        .nginx(
            "a.conf",
            "server { server_name a.example; location / { proxy_pass http://127.0.0.1:3000; } }\n",
        )
        .nginx(
            "b.conf",
            "server { server_name b.example www.b.example; location / { proxy_pass http://127.0.0.1:3000/; } }\n",
        );
    let host = ScriptedHost::new().listening(3000, 50, "node");
    let queries = host.query_log();

    let (inventory, resolution) = fixture.service(host).run().await.unwrap();
    let target = Target::network("127.0.0.1", 3000);

    assert_eq!(resolution.len(), 1);
    assert_eq!(
        inventory.domains_for(&target),
        BTreeSet::from(["a.example", "b.example", "www.b.example"])
    );
    assert_eq!(
        queries
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.starts_with("port"))
            .count(),
        1
    );

    let text = report::render(&inventory, &resolution);
    assert!(text.contains("domains..: a.example, b.example, www.b.example"));
}

#[tokio::test]
async fn no_configuration_directories_is_fatal() {
    let fixture = Fixture::new();
    let service = fixture.service(ScriptedHost::new());

    let err = service.extract().unwrap_err();
    let InventoryError::NoConfigAccessible { searched } = err;
    assert_eq!(
        searched,
        vec![fixture.dir(ServerKind::Nginx), fixture.dir(ServerKind::Apache)]
    );
}

#[tokio::test]
async fn missing_apache_directory_still_reports_nginx() {
    let fixture = Fixture::new().nginx(
        "site",
        "server { server_name only.example; proxy_pass http://127.0.0.1:7000; }\n",
    );
    let (inventory, resolution) = fixture.service(ScriptedHost::new()).run().await.unwrap();

    assert!(inventory.sources.contains_key(&ServerKind::Nginx));
    assert!(!inventory.sources.contains_key(&ServerKind::Apache));
    assert_eq!(resolution.unresolved_count(), 1);
    assert!(report::render(&inventory, &resolution).contains("unit.....: unresolved"));
}

#[tokio::test]
async fn empty_directories_report_no_targets() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = Config {
        nginx_dirs: vec![dir.path().to_path_buf()],
        apache_dirs: vec![PathBuf::from("/nonexistent/proxmap/apache")],
        ..Config::default()
    };
    let service = InventoryService::new(Box::new(ScriptedHost::new()), config);

    let (inventory, resolution) = service.run().await.unwrap();
    assert!(resolution.is_empty());
    assert_eq!(report::render(&inventory, &resolution), "no targets found\n");
}

#[tokio::test]
async fn named_backend_found_by_process_name() {
    let fixture = Fixture::new().nginx(
        "api",
        "upstream api_pool {\n  server redis-api:6000;\n}\nserver {\n  server_name api.example;\n  location / { proxy_pass http://api_pool; }\n}\n",
    );
    let host = ScriptedHost::new().running("redis-api", 31).unit(31, "redis-api.service");

    let (_, resolution) = fixture.service(host).run().await.unwrap();
    let record = resolution.get(&Target::network("redis-api", 6000)).unwrap();
    assert_eq!(record.systemd_unit.as_deref(), Some("redis-api.service"));
}

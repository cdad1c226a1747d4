use std::collections::BTreeSet;

use proxmap_common::proxy::target::Target;
use proxmap_core::report;

use crate::support::{Fixture, ScriptedHost};

/// nginx forwards to apache on :8080 and apache forwards back to nginx on :80.
fn cyclic_fixture() -> Fixture {
    Fixture::new()
        .nginx(
            "loop",
            "server { listen 80; server_name loop.example; location / { proxy_pass http://127.0.0.1:8080; } }\n",
        )
        .apache(
            "loop.conf",
            "<VirtualHost *:8080>\n  ServerName loop.example\n  ProxyPass / http://127.0.0.1:80/\n</VirtualHost>\n",
        )
}

fn cyclic_host() -> ScriptedHost {
    ScriptedHost::new()
        .listening(8080, 10, "apache2")
        .listening(80, 20, "nginx")
        .unit(10, "apache2.service")
        .unit(20, "nginx.service")
}

#[tokio::test]
async fn cycle_terminates_with_one_record_per_target() {
    let fixture = cyclic_fixture();
    let host = cyclic_host();
    let queries = host.query_log();

    let (inventory, resolution) = fixture.service(host).run().await.unwrap();

    assert_eq!(resolution.len(), 2);
    assert_eq!(
        queries
            .lock()
            .unwrap()
            .iter()
            .filter(|q| q.starts_with("port"))
            .count(),
        2
    );

    let text = report::render(&inventory, &resolution);
    assert!(text.contains("(see above)"));
    assert!(text.contains("(cycle)"));
}

#[tokio::test]
async fn every_extracted_target_has_exactly_one_record() {
    let fixture = Fixture::new()
        .nginx(
            "mixed",
            "upstream pool { server 127.0.0.1:5001; server 127.0.0.1:5002; }\n\
             server { server_name a.example; location / { proxy_pass http://pool; } location /php { fastcgi_pass unix:/run/php.sock; } }\n\
             server { server_name b.example; proxy_pass http://127.0.0.1:5001; }\n",
        )
        .apache(
            "mixed.conf",
            "<VirtualHost *:80>\n  ServerName c.example\n  ProxyPass / http://127.0.0.1:5002/\n  ProxyPass /x http://127.0.0.1:5003/\n</VirtualHost>\n",
        );

    let (inventory, resolution) = fixture.service(ScriptedHost::new()).run().await.unwrap();
    let targets = inventory.targets();

    assert_eq!(targets.len(), 4);
    assert_eq!(resolution.len(), targets.len());
    for target in &targets {
        assert!(resolution.get(target).is_some(), "no record for {target}");
    }
}

#[tokio::test]
async fn domains_follow_their_block() {
    let fixture = Fixture::new().nginx(
        "blocks",
        "server { server_name d1.example d2.example; proxy_pass http://127.0.0.1:4001; }\n\
         server { listen 8081; proxy_pass http://127.0.0.1:4002; }\n",
    );

    let (inventory, resolution) = fixture.service(ScriptedHost::new()).run().await.unwrap();
    let with_domains = Target::network("127.0.0.1", 4001);
    let without = Target::network("127.0.0.1", 4002);

    assert_eq!(
        inventory.domains_for(&with_domains),
        BTreeSet::from(["d1.example", "d2.example"])
    );
    assert!(inventory.domains_for(&without).is_empty());

    let text = report::render(&inventory, &resolution);
    assert!(text.contains("127.0.0.1:4002\n"));
    assert!(text.contains("domains..: -"));
}

#[tokio::test]
async fn repeated_runs_give_the_same_report() {
    let fixture = cyclic_fixture();

    let (inventory, first) = fixture.service(cyclic_host()).run().await.unwrap();
    let (_, second) = fixture.service(cyclic_host()).run().await.unwrap();

    assert_eq!(
        report::render(&inventory, &first),
        report::render(&inventory, &second)
    );
}

#[tokio::test]
async fn self_served_vhosts_report_stays_small() {
    let vhosts = 12u16;
    let mut config = String::new();
    let mut host = ScriptedHost::new().unit(1, "nginx.service");
    for i in 0..vhosts {
        config.push_str(&format!(
            "server {{ listen {}; server_name v{i}.example; location / {{ proxy_pass http://127.0.0.1:{}; }} }}\n",
            7000 + i,
            8000 + i
        ));
        host = host.listening(8000 + i, 1, "nginx");
    }
    let fixture = Fixture::new().nginx("vhosts", &config);

    let (inventory, resolution) = fixture.service(host).run().await.unwrap();
    assert_eq!(resolution.len(), usize::from(vhosts));

    let text = report::render(&inventory, &resolution);
    let links: usize = resolution.iter().map(|r| r.proxies_to.len()).sum();
    let chain_lines = text
        .split("\nchains:\n")
        .nth(1)
        .unwrap()
        .lines()
        .take_while(|line| line.starts_with("  "))
        .count();
    assert!(chain_lines > 0);
    assert!(chain_lines <= links, "{chain_lines} chain lines for {links} links");
}

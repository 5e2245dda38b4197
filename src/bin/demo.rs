//! 演示程序
//!
//! 复刻最初的Gremlin演示脚本场景：添加person/software顶点、
//! 用created边连接、列表、计数、删除。与脚本不同的是，
//! 所有操作显式串行等待终态——需要前一个操作的效果对
//! 后一个操作可见时，必须先等它完成

use clap::Parser;
use log::{error, info};
use std::path::PathBuf;

use graphdb_client::{ClientConfig, ClientResult, GraphClient, Value};
use graphdb_client::utils::logging;

#[derive(Parser, Debug)]
#[command(name = "graphdb-client-demo", about = "Graph traversal client demo")]
struct Args {
    /// 配置文件路径 (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// 服务端地址，覆盖配置文件中的endpoint
    #[arg(long)]
    endpoint: Option<String>,
}

async fn add_person(g: &GraphClient, name: &str, age: i64) -> ClientResult<()> {
    let exists = g
        .v()
        .has_label("person")
        .has("name", name)
        .next()
        .await?;
    if exists.is_some() {
        info!("Person {} already exists", name);
        return Ok(());
    }
    let vertex = g
        .add_v("person")
        .property("name", name)
        .property("age", age)
        .next()
        .await?;
    match vertex {
        Some(v) => info!("New person: {}", v),
        None => error!("Server returned no vertex for addV"),
    }
    Ok(())
}

async fn add_software(g: &GraphClient, name: &str, lang: &str) -> ClientResult<()> {
    let exists = g
        .v()
        .has_label("software")
        .has("name", name)
        .has("lang", lang)
        .next()
        .await?;
    if exists.is_some() {
        info!("Software {} already exists", name);
        return Ok(());
    }
    let vertex = g
        .add_v("software")
        .property("name", name)
        .property("lang", lang)
        .next()
        .await?;
    match vertex {
        Some(v) => info!("New software: {}", v),
        None => error!("Server returned no vertex for addV"),
    }
    Ok(())
}

async fn add_edge(g: &GraphClient, person: &str, software: &str) -> ClientResult<()> {
    let v1 = g.v().has_label("person").has("name", person).next().await?;
    let v2 = g
        .v()
        .has_label("software")
        .has("name", software)
        .next()
        .await?;
    let (v1, v2) = match (v1, v2) {
        (Some(v1), Some(v2)) => (v1, v2),
        _ => {
            info!("Endpoints for edge {} -> {} not found", person, software);
            return Ok(());
        }
    };
    let (v1id, v2id) = match (v1.as_vertex(), v2.as_vertex()) {
        (Some(v1), Some(v2)) => (v1.id.clone(), v2.id.clone()),
        _ => {
            error!("Expected vertex records, got {} and {}", v1, v2);
            return Ok(());
        }
    };
    let edge = g
        .v_id(v1id)
        .add_e("created")
        .to(v2id)
        .property("weight", 0.4)
        .next()
        .await?;
    match edge {
        Some(e) => info!("New edge: {}", e),
        None => error!("Server returned no edge for addE"),
    }
    Ok(())
}

async fn delete_edge(g: &GraphClient, person: &str, software: &str) -> ClientResult<()> {
    let v1 = g.v().has_label("person").has("name", person).next().await?;
    let v2 = g
        .v()
        .has_label("software")
        .has("name", software)
        .next()
        .await?;
    let (v1id, v2id) = match (
        v1.as_ref().and_then(|v| v.as_vertex()),
        v2.as_ref().and_then(|v| v.as_vertex()),
    ) {
        (Some(v1), Some(v2)) => (v1.id.clone(), v2.id.clone()),
        _ => {
            info!("Endpoints for edge {} -> {} not found", person, software);
            return Ok(());
        }
    };
    // iterate() 返回受影响的条数：删了0条与删除成功不再混淆
    let dropped = g
        .v_id(v1id)
        .out_e("created")
        .in_v()
        .has_id(v2id)
        .drop_elements()
        .iterate()
        .await?;
    if dropped > 0 {
        info!("Edge deleted successfully ({} element(s))", dropped);
    } else {
        info!("Edge between {} and {} does not exist", person, software);
    }
    Ok(())
}

async fn delete_all_softwares(g: &GraphClient) -> ClientResult<()> {
    let dropped = g.v().has_label("software").drop_elements().iterate().await?;
    info!("Deleted {} software vertex(es)", dropped);
    Ok(())
}

async fn list_all(g: &GraphClient) -> ClientResult<()> {
    let vertices = g.v().to_list().await?;
    println!(
        "Vertices ({}): {}",
        vertices.len(),
        serde_json::to_string(&vertices).unwrap_or_default()
    );

    let edges = g.e().to_list().await?;
    println!(
        "Edges ({}): {}",
        edges.len(),
        serde_json::to_string(&edges).unwrap_or_default()
    );

    let persons = g.v().has_label("person").values("name").to_list().await?;
    println!(
        "Persons ({}): {}",
        persons.len(),
        serde_json::to_string(&persons).unwrap_or_default()
    );

    let softwares = g.v().has_label("software").values("name").to_list().await?;
    println!(
        "Softwares ({}): {}",
        softwares.len(),
        serde_json::to_string(&softwares).unwrap_or_default()
    );
    Ok(())
}

async fn count_softwares(g: &GraphClient) -> ClientResult<()> {
    // count遍历恒有结果：空图返回0，而不是"无结果"
    match g.v().has_label("software").count().next().await? {
        Some(Value::Int(n)) => println!("Softwares count: {}", n),
        other => error!("Unexpected count result: {:?}", other),
    }
    Ok(())
}

async fn run(g: &GraphClient) -> ClientResult<()> {
    add_person(g, "linus", 45).await?;
    add_person(g, "james", 64).await?;

    add_software(g, "git", "bash").await?;
    add_software(g, "linux", "bash").await?;
    add_software(g, "java", "c").await?;

    add_edge(g, "linus", "git").await?;
    add_edge(g, "linus", "linux").await?;
    add_edge(g, "james", "java").await?;

    list_all(g).await?;
    count_softwares(g).await?;

    delete_edge(g, "linus", "git").await?;
    delete_all_softwares(g).await?;
    count_softwares(g).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match ClientConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ClientConfig::default(),
    };
    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }

    if let Err(e) = logging::init(&config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    println!("Welcome to graphdb-client");

    let client = GraphClient::new(config);
    if let Err(e) = client.connect().await {
        error!("Failed to connect: {}", e);
        logging::shutdown();
        std::process::exit(1);
    }

    if let Err(e) = run(&client).await {
        error!("Demo run failed: {}", e);
    }

    client.close();
    logging::shutdown();
}

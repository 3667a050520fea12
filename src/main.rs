//! vultr-mcp CLI - Vultr infrastructure over the Model Context Protocol
//!
//! Run `vultr-mcp --help` for usage information.

use clap::{Parser, Subcommand, ValueEnum};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vultr_mcp::client::{CreateDomainRequest, HttpTransport, RecordRequest};
use vultr_mcp::config::{Config, LogFormat, API_KEY_ENV, DEFAULT_CONFIG_TEMPLATE};
use vultr_mcp::dns::DEFAULT_TTL;
use vultr_mcp::mcp::{McpServer, ToolModule};
use vultr_mcp::router::ToolFilter;
use vultr_mcp::tools::block_storage::BlockStorageTools;
use vultr_mcp::tools::configured_modules;
use vultr_mcp::tools::dns::DnsTools;
use vultr_mcp::tools::iso::IsoTools;
use vultr_mcp::tools::kubernetes::KubernetesTools;
use vultr_mcp::tools::load_balancer::LoadBalancerTools;
use vultr_mcp::tools::managed_databases::DatabaseTools;
use vultr_mcp::tools::object_storage::ObjectStorageTools;
use vultr_mcp::tools::os::OsTools;
use vultr_mcp::tools::plans::PlanTools;
use vultr_mcp::tools::startup_scripts::StartupScriptTools;
use vultr_mcp::tools::vpcs::VpcTools;
use vultr_mcp::VultrClient;

#[derive(Parser)]
#[command(
    name = "vultr-mcp",
    about = "Manage Vultr infrastructure from an LLM agent over the Model Context Protocol",
    version
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Vultr API key (overrides the configuration file)
    #[arg(long, env = API_KEY_ENV, global = true, hide_env_values = true)]
    api_key: Option<String>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio
    #[command(alias = "mcp")]
    Serve,

    /// Manage DNS domains
    Domains {
        #[command(subcommand)]
        action: DomainAction,
    },

    /// Manage DNS records
    Records {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Export or import BIND zone files
    Zone {
        #[command(subcommand)]
        action: ZoneAction,
    },

    /// Inspect instances
    Instances {
        #[command(subcommand)]
        action: InstanceAction,
    },

    /// Create the apex A record and www CNAME for a website
    SetupWebsite {
        domain: String,
        ip: String,
        /// Skip the www CNAME
        #[arg(long)]
        no_www: bool,
        #[arg(long)]
        ttl: Option<u32>,
    },

    /// Create the MX record that routes a domain's mail
    SetupEmail {
        domain: String,
        mail_server: String,
        #[arg(long, default_value_t = 10)]
        priority: u32,
        #[arg(long)]
        ttl: Option<u32>,
    },

    /// Manage block storage volumes
    BlockStorage {
        #[command(subcommand)]
        action: BlockStorageAction,
    },

    /// Manage VPC and VPC 2.0 networks
    Vpcs {
        #[command(subcommand)]
        action: VpcAction,
    },

    /// Manage ISO images
    Iso {
        #[command(subcommand)]
        action: IsoAction,
    },

    /// Browse operating system images
    Os {
        #[command(subcommand)]
        action: OsAction,
    },

    /// Browse compute plans
    Plans {
        #[command(subcommand)]
        action: PlanAction,
    },

    /// Manage startup scripts
    StartupScripts {
        #[command(subcommand)]
        action: ScriptAction,
    },

    /// Inspect and plan Kubernetes clusters
    Kubernetes {
        #[command(subcommand)]
        action: KubernetesAction,
    },

    /// Inspect load balancers
    LoadBalancer {
        #[command(subcommand)]
        action: LoadBalancerAction,
    },

    /// Inspect managed databases
    Databases {
        #[command(subcommand)]
        action: DatabaseAction,
    },

    /// Inspect object storage subscriptions
    ObjectStorage {
        #[command(subcommand)]
        action: ObjectStorageAction,
    },

    /// Print the MCP tool catalog
    Tools {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum DomainAction {
    /// List all domains
    List,
    /// Show a domain and its record count
    Info { domain: String },
    /// Create a domain pointing at an IP address
    Create { domain: String, ip: String },
    /// Delete a domain and all its records
    Delete {
        domain: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum RecordAction {
    /// List the records of a domain
    List {
        domain: String,
        /// Only records of this type
        #[arg(short = 't', long = "type")]
        record_type: Option<String>,
    },
    /// Add a record
    Add {
        domain: String,
        record_type: String,
        name: String,
        value: String,
        #[arg(long, default_value_t = DEFAULT_TTL)]
        ttl: u32,
        #[arg(long)]
        priority: Option<u32>,
    },
    /// Delete a record
    Delete {
        domain: String,
        record_id: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum ZoneAction {
    /// Print a domain's records as a zone file
    Export { domain: String },
    /// Create records from a zone file
    Import {
        domain: String,
        file: PathBuf,
        /// Parse and report without creating records
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum InstanceAction {
    /// List all instances
    List,
}

#[derive(Subcommand)]
enum BlockStorageAction {
    /// List all volumes
    List,
    /// Show a volume
    Get { volume: String },
    /// Create a volume
    Create {
        region: String,
        size_gb: u32,
        #[arg(long)]
        label: Option<String>,
        #[arg(long, value_parser = ["high_perf", "storage_opt"])]
        block_type: Option<String>,
    },
    /// Attach a volume to an instance
    Attach {
        volume: String,
        instance: String,
        /// Attach with the instance stopped
        #[arg(long)]
        no_live: bool,
    },
    /// Detach a volume from its instance
    Detach {
        volume: String,
        #[arg(long)]
        no_live: bool,
    },
    /// Print the commands that format and mount a volume
    MountHelp { volume: String },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NetworkKind {
    All,
    Vpc,
    Vpc2,
}

#[derive(Subcommand)]
enum VpcAction {
    /// List networks
    List {
        #[arg(long = "type", value_enum, default_value_t = NetworkKind::All)]
        kind: NetworkKind,
    },
    /// Create a network
    Create {
        region: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "type", value_enum, default_value_t = NetworkKind::Vpc)]
        kind: NetworkKind,
        /// Network address, e.g. 10.99.0.0
        #[arg(long)]
        subnet: Option<String>,
        /// Prefix length, e.g. 24
        #[arg(long)]
        subnet_mask: Option<u8>,
    },
    /// Attach a network to an instance
    Attach {
        vpc: String,
        instance: String,
        #[arg(long = "type", value_enum, default_value_t = NetworkKind::Vpc)]
        kind: NetworkKind,
    },
    /// Detach a network from an instance
    Detach {
        vpc: String,
        instance: String,
        #[arg(long = "type", value_enum, default_value_t = NetworkKind::Vpc)]
        kind: NetworkKind,
    },
    /// List the networks of an instance
    ListInstance { instance: String },
    /// Describe a network
    Info {
        vpc: String,
        #[arg(long = "type", value_enum, default_value_t = NetworkKind::All)]
        kind: NetworkKind,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IsoFilter {
    All,
    Public,
    Custom,
}

#[derive(Subcommand)]
enum IsoAction {
    /// List ISO images
    List {
        #[arg(long, value_enum, default_value_t = IsoFilter::All)]
        filter: IsoFilter,
    },
    /// Download an ISO from a URL
    Create { url: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum OsFilter {
    All,
    Linux,
    Windows,
    Apps,
}

#[derive(Subcommand)]
enum OsAction {
    /// List operating system images
    List {
        #[arg(long, value_enum, default_value_t = OsFilter::All)]
        filter: OsFilter,
    },
}

#[derive(Subcommand)]
enum PlanAction {
    /// List plans, optionally filtered by specs
    List {
        /// Plan family, e.g. vc2, vhf or voc
        #[arg(short = 't', long = "type")]
        plan_type: Option<String>,
        #[arg(long)]
        min_vcpus: Option<u64>,
        #[arg(long)]
        min_ram_mb: Option<u64>,
        #[arg(long)]
        max_cost: Option<f64>,
    },
}

#[derive(Subcommand)]
enum ScriptAction {
    /// List startup scripts
    List {
        #[arg(short = 't', long = "type", value_parser = ["boot", "pxe"])]
        script_type: Option<String>,
    },
    /// Create a startup script from a file
    Create {
        name: String,
        file: PathBuf,
        #[arg(short = 't', long = "type", default_value = "boot", value_parser = ["boot", "pxe"])]
        script_type: String,
    },
    /// Delete a startup script
    Delete {
        script: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum KubernetesAction {
    /// List clusters
    List,
    /// Show a cluster and its status
    Get { cluster: String },
    /// Estimate the monthly cost of a cluster
    Costs { cluster: String },
    /// Create a cluster sized for a workload
    Setup {
        label: String,
        region: String,
        #[arg(long, default_value = "web", value_parser = ["web", "api", "data", "development"])]
        workload: String,
        #[arg(
            long,
            default_value = "production",
            value_parser = ["production", "staging", "development"]
        )]
        environment: String,
        #[arg(long)]
        no_auto_scaling: bool,
    },
}

#[derive(Subcommand)]
enum LoadBalancerAction {
    /// List load balancers
    List,
    /// Show a load balancer's configuration summary
    Get { load_balancer: String },
}

#[derive(Subcommand)]
enum DatabaseAction {
    /// List managed databases
    List {
        #[arg(long, value_parser = ["mysql", "pg", "valkey", "kafka"])]
        engine: Option<String>,
    },
    /// Show a managed database
    Get { database: String },
}

#[derive(Subcommand)]
enum ObjectStorageAction {
    /// List subscriptions
    List,
    /// Show a subscription's S3 settings
    Get { object_storage: String },
    /// List object storage clusters
    Clusters,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // `init` creates the file the other commands read
    if let Commands::Init { force } = cli.command {
        return init_config(cli.config, force).await;
    }

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path).await?
    } else {
        let default_path = Config::default_path();
        if default_path.exists() {
            Config::load(&default_path).await?
        } else {
            Config::default()
        }
    };
    let config = config.with_api_key(cli.api_key.clone());

    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Serve => run_mcp_server(config).await?,
        Commands::Domains { action } => {
            let client = VultrClient::from_config(&config)?;
            match action {
                DomainAction::List => list_domains(&client).await?,
                DomainAction::Info { domain } => domain_info(&client, &domain).await?,
                DomainAction::Create { domain, ip } => create_domain(&client, domain, ip).await?,
                DomainAction::Delete { domain, yes } => {
                    if yes || confirm(&format!("Delete domain {} and all its records?", domain))? {
                        client.delete_domain(&domain).await?;
                        println!("Domain {} deleted", domain);
                    }
                }
            }
        }
        Commands::Records { action } => {
            let client = VultrClient::from_config(&config)?;
            match action {
                RecordAction::List { domain, record_type } => {
                    list_records(&client, &domain, record_type.as_deref()).await?
                }
                RecordAction::Add {
                    domain,
                    record_type,
                    name,
                    value,
                    ttl,
                    priority,
                } => {
                    let request = RecordRequest {
                        record_type: record_type.to_uppercase(),
                        name,
                        data: value,
                        ttl: Some(ttl),
                        priority,
                    };
                    let record = client.create_record(&domain, &request).await?;
                    println!(
                        "Created {} record {}",
                        request.record_type,
                        field(&record, "id")
                    );
                }
                RecordAction::Delete {
                    domain,
                    record_id,
                    yes,
                } => {
                    if yes || confirm(&format!("Delete record {} from {}?", record_id, domain))? {
                        client.delete_record(&domain, &record_id).await?;
                        println!("Record {} deleted", record_id);
                    }
                }
            }
        }
        Commands::Zone { action } => {
            let client = VultrClient::from_config(&config)?;
            match action {
                ZoneAction::Export { domain } => {
                    print!("{}", client.export_zone_file(&domain).await?);
                }
                ZoneAction::Import {
                    domain,
                    file,
                    dry_run,
                } => import_zone(&client, &domain, file, dry_run).await?,
            }
        }
        Commands::Instances {
            action: InstanceAction::List,
        } => {
            let client = VultrClient::from_config(&config)?;
            list_instances(&client).await?;
        }
        Commands::SetupWebsite {
            domain,
            ip,
            no_www,
            ttl,
        } => {
            let dns = DnsTools::new(shared_client(&config)?);
            let args = json!({"domain": domain, "ip": ip, "www_enabled": !no_www, "ttl": ttl});
            let created = dns.call("setup_website", args).await?;
            report_records(&domain, "Website", &created);
        }
        Commands::SetupEmail {
            domain,
            mail_server,
            priority,
            ttl,
        } => {
            let dns = DnsTools::new(shared_client(&config)?);
            let args = json!({
                "domain": domain,
                "mail_server": mail_server,
                "priority": priority,
                "ttl": ttl,
            });
            let created = dns.call("setup_email", args).await?;
            report_records(&domain, "Email", &created);
        }
        Commands::BlockStorage { action } => {
            block_storage(shared_client(&config)?, action).await?
        }
        Commands::Vpcs { action } => vpcs(shared_client(&config)?, action).await?,
        Commands::Iso { action } => iso(shared_client(&config)?, action).await?,
        Commands::Os {
            action: OsAction::List { filter },
        } => {
            let os = OsTools::new(shared_client(&config)?);
            let tool = match filter {
                OsFilter::All => "list_operating_systems",
                OsFilter::Linux => "list_linux_os",
                OsFilter::Windows => "list_windows_os",
                OsFilter::Apps => "list_application_images",
            };
            print_result(&os.call(tool, json!({})).await?, OS_COLUMNS)?;
        }
        Commands::Plans {
            action:
                PlanAction::List {
                    plan_type,
                    min_vcpus,
                    min_ram_mb,
                    max_cost,
                },
        } => {
            let plans = PlanTools::new(shared_client(&config)?);
            let result = if min_vcpus.is_none() && min_ram_mb.is_none() && max_cost.is_none() {
                plans.call("list_plans", json!({"plan_type": plan_type})).await?
            } else {
                let filter = json!({
                    "plan_type": plan_type,
                    "min_vcpus": min_vcpus,
                    "min_ram_mb": min_ram_mb,
                    "max_monthly_cost": max_cost,
                });
                plans.call("search_plans_by_specs", filter).await?
            };
            print_result(&result, PLAN_COLUMNS)?;
        }
        Commands::StartupScripts { action } => {
            startup_scripts(shared_client(&config)?, action).await?
        }
        Commands::Kubernetes { action } => {
            kubernetes(shared_client(&config)?, action).await?
        }
        Commands::LoadBalancer { action } => {
            let lb = LoadBalancerTools::new(shared_client(&config)?);
            match action {
                LoadBalancerAction::List => {
                    print_result(&lb.call("list", json!({})).await?, LB_COLUMNS)?
                }
                LoadBalancerAction::Get { load_balancer } => {
                    let args = json!({"load_balancer_id": load_balancer});
                    print_result(&lb.call("get_configuration_summary", args).await?, &[])?
                }
            }
        }
        Commands::Databases { action } => {
            let databases = DatabaseTools::new(shared_client(&config)?);
            match action {
                DatabaseAction::List { engine } => {
                    let mut result = databases.call("list", json!({})).await?;
                    if let (Some(engine), Some(rows)) = (engine, result.as_array_mut()) {
                        rows.retain(|db| field(db, "database_engine") == engine);
                    }
                    print_result(&result, DATABASE_COLUMNS)?;
                }
                DatabaseAction::Get { database } => {
                    let args = json!({"database_id": database});
                    print_result(&databases.call("get", args).await?, &[])?
                }
            }
        }
        Commands::ObjectStorage { action } => {
            let storage = ObjectStorageTools::new(shared_client(&config)?);
            match action {
                ObjectStorageAction::List => {
                    print_result(&storage.call("list", json!({})).await?, OBJECT_STORAGE_COLUMNS)?
                }
                ObjectStorageAction::Get { object_storage } => {
                    let args = json!({"object_storage_id": object_storage});
                    print_result(&storage.call("get_s3_config", args).await?, &[])?
                }
                ObjectStorageAction::Clusters => {
                    let clusters = storage.call("list_clusters", json!({})).await?;
                    print_result(&clusters, CLUSTER_COLUMNS)?
                }
            }
        }
        Commands::Tools { format } => list_tools(&config, format)?,
        Commands::Init { .. } => {}
    }

    Ok(())
}

/// Logs always go to stderr; stdout carries the MCP protocol
fn init_logging(config: &Config, verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        1 => EnvFilter::from_default_env().add_directive(Level::DEBUG.into()),
        _ => EnvFilter::from_default_env().add_directive(Level::TRACE.into()),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_writer(io::stderr)).init(),
    }
}

/// Build the server with the configured modules and tool filter
fn build_server(
    config: &Config,
    client: Arc<VultrClient>,
) -> Result<McpServer, Box<dyn std::error::Error>> {
    let filter = ToolFilter::from_patterns(&config.mcp.tools)?;
    Ok(McpServer::new(config.mcp.name.clone(), client.clone())
        .with_filter(filter)
        .mount_all(configured_modules(&config.mcp, client)))
}

/// Run the MCP server for LLM integration
async fn run_mcp_server(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let client = shared_client(&config)?;
    let mut server = build_server(&config, client)?;
    server.run_stdio().await?;
    Ok(())
}

fn shared_client(config: &Config) -> Result<Arc<VultrClient>, Box<dyn std::error::Error>> {
    Ok(Arc::new(VultrClient::from_config(config)?))
}

fn field<'a>(value: &'a Value, name: &str) -> &'a str {
    value.get(name).and_then(Value::as_str).unwrap_or("-")
}

fn confirm(prompt: &str) -> Result<bool, Box<dyn std::error::Error>> {
    eprint!("{} [y/N]: ", prompt);
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn list_domains(client: &VultrClient) -> Result<(), Box<dyn std::error::Error>> {
    let domains = client.list_domains().await?;
    if domains.is_empty() {
        println!("No domains found");
        return Ok(());
    }

    println!("{:<40} {:<10} {}", "DOMAIN", "DNSSEC", "CREATED");
    println!("{}", "-".repeat(80));
    for domain in &domains {
        println!(
            "{:<40} {:<10} {}",
            field(domain, "domain"),
            field(domain, "dns_sec"),
            field(domain, "date_created")
        );
    }
    Ok(())
}

async fn domain_info(client: &VultrClient, domain: &str) -> Result<(), Box<dyn std::error::Error>> {
    let info = client.get_domain(domain).await?;
    let records = client.list_records(domain).await?;

    println!("Domain:     {}", field(&info, "domain"));
    println!("DNSSEC:     {}", field(&info, "dns_sec"));
    println!("Created:    {}", field(&info, "date_created"));
    println!("Records:    {}", records.len());
    Ok(())
}

async fn create_domain(
    client: &VultrClient,
    domain: String,
    ip: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = CreateDomainRequest {
        domain,
        ip: Some(ip),
        dns_sec: Some("disabled".to_string()),
    };
    client.create_domain(&request).await?;
    println!("Domain {} created", request.domain);
    Ok(())
}

async fn list_records(
    client: &VultrClient,
    domain: &str,
    record_type: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let records: Vec<Value> = client
        .list_records(domain)
        .await?
        .into_iter()
        .filter(|r| record_type.map_or(true, |t| field(r, "type").eq_ignore_ascii_case(t)))
        .collect();
    if records.is_empty() {
        println!("No records found");
        return Ok(());
    }

    println!("{:<36} {:<6} {:<24} {:<6} {}", "ID", "TYPE", "NAME", "TTL", "DATA");
    println!("{}", "-".repeat(100));
    for record in &records {
        let ttl = record.get("ttl").map(Value::to_string).unwrap_or_default();
        println!(
            "{:<36} {:<6} {:<24} {:<6} {}",
            field(record, "id"),
            field(record, "type"),
            field(record, "name"),
            ttl,
            field(record, "data")
        );
    }
    Ok(())
}

async fn import_zone(
    client: &VultrClient,
    domain: &str,
    file: PathBuf,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let zone_data = tokio::fs::read_to_string(&file).await?;
    let results = client.import_zone_file(domain, &zone_data, dry_run).await?;

    let errors = results.iter().filter(|r| r.get("error").is_some()).count();
    for result in &results {
        if let Some(error) = result.get("error").and_then(Value::as_str) {
            eprintln!("error: {} ({})", error, field(result, "line"));
        }
    }

    let verb = if dry_run { "Would create" } else { "Created" };
    println!("{} {} records, {} errors", verb, results.len() - errors, errors);
    info!(domain = %domain, file = %file.display(), dry_run, "Zone import finished");
    Ok(())
}

async fn list_instances(client: &VultrClient) -> Result<(), Box<dyn std::error::Error>> {
    let instances = client.list_instances().await?;
    if instances.is_empty() {
        println!("No instances found");
        return Ok(());
    }

    println!(
        "{:<36} {:<24} {:<16} {:<8} {}",
        "ID", "LABEL", "MAIN IP", "REGION", "STATUS"
    );
    println!("{}", "-".repeat(100));
    for instance in &instances {
        println!(
            "{:<36} {:<24} {:<16} {:<8} {}",
            field(instance, "id"),
            field(instance, "label"),
            field(instance, "main_ip"),
            field(instance, "region"),
            field(instance, "status")
        );
    }
    Ok(())
}

/// Table column: header, JSON field, width
type Column = (&'static str, &'static str, usize);

const BLOCK_COLUMNS: &[Column] = &[
    ("ID", "id", 36),
    ("LABEL", "label", 20),
    ("REGION", "region", 8),
    ("SIZE GB", "size_gb", 8),
    ("STATUS", "status", 10),
    ("ATTACHED TO", "attached_to_instance", 36),
];
const VPC_COLUMNS: &[Column] = &[
    ("ID", "id", 36),
    ("DESCRIPTION", "description", 24),
    ("REGION", "region", 8),
    ("SUBNET", "v4_subnet", 16),
    ("MASK", "v4_subnet_mask", 4),
];
const VPC2_COLUMNS: &[Column] = &[
    ("ID", "id", 36),
    ("DESCRIPTION", "description", 24),
    ("REGION", "region", 8),
    ("IP BLOCK", "ip_block", 16),
    ("PREFIX", "prefix_length", 6),
];
const ISO_COLUMNS: &[Column] = &[
    ("ID", "id", 36),
    ("NAME", "name", 32),
    ("FILENAME", "filename", 32),
    ("STATUS", "status", 10),
];
const OS_COLUMNS: &[Column] = &[
    ("ID", "id", 6),
    ("NAME", "name", 40),
    ("ARCH", "arch", 6),
    ("FAMILY", "family", 16),
];
const PLAN_COLUMNS: &[Column] = &[
    ("ID", "id", 28),
    ("VCPUS", "vcpu_count", 6),
    ("RAM MB", "ram", 8),
    ("DISK GB", "disk", 8),
    ("MONTHLY", "monthly_cost", 8),
    ("TYPE", "type", 6),
];
const SCRIPT_COLUMNS: &[Column] = &[
    ("ID", "id", 36),
    ("NAME", "name", 30),
    ("TYPE", "type", 6),
    ("MODIFIED", "date_modified", 25),
];
const CLUSTER_K8S_COLUMNS: &[Column] = &[
    ("ID", "id", 36),
    ("LABEL", "label", 24),
    ("REGION", "region", 8),
    ("VERSION", "version", 14),
    ("STATUS", "status", 10),
];
const LB_COLUMNS: &[Column] = &[
    ("ID", "id", 36),
    ("LABEL", "label", 24),
    ("REGION", "region", 8),
    ("IPV4", "ipv4", 16),
    ("STATUS", "status", 10),
];
const DATABASE_COLUMNS: &[Column] = &[
    ("ID", "id", 36),
    ("LABEL", "label", 24),
    ("ENGINE", "database_engine", 8),
    ("REGION", "region", 8),
    ("STATUS", "status", 10),
];
const OBJECT_STORAGE_COLUMNS: &[Column] = &[
    ("ID", "id", 36),
    ("LABEL", "label", 24),
    ("REGION", "region", 8),
    ("HOSTNAME", "s3_hostname", 28),
    ("STATUS", "status", 10),
];
const CLUSTER_COLUMNS: &[Column] = &[
    ("ID", "id", 6),
    ("REGION", "region", 8),
    ("HOSTNAME", "hostname", 28),
    ("DEPLOY", "deploy", 6),
];

fn cell(row: &Value, name: &str) -> String {
    match row.get(name) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::String(_)) | Some(Value::Null) | None => "-".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Print a list as a table, anything else as pretty JSON
fn print_result(result: &Value, columns: &[Column]) -> Result<(), Box<dyn std::error::Error>> {
    let rows = match result.as_array() {
        Some(rows) if !columns.is_empty() => rows,
        _ => {
            println!("{}", serde_json::to_string_pretty(result)?);
            return Ok(());
        }
    };
    if rows.is_empty() {
        println!("Nothing found");
        return Ok(());
    }

    let line = |cells: Vec<String>| {
        let text = cells
            .iter()
            .zip(columns)
            .map(|(cell, (_, _, width))| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{}", text.trim_end());
    };
    line(columns.iter().map(|(header, _, _)| header.to_string()).collect());
    println!("{}", "-".repeat(columns.iter().map(|(_, _, width)| width + 1).sum()));
    for row in rows {
        line(columns.iter().map(|(_, name, _)| cell(row, name)).collect());
    }
    Ok(())
}

/// Summarize records created by the setup commands
fn report_records(domain: &str, what: &str, created: &Value) {
    println!("Setting up {} for {}:", what.to_lowercase(), domain);
    for record in created.as_array().map(Vec::as_slice).unwrap_or_default() {
        println!(
            "  {} {} -> {}",
            field(record, "type"),
            field(record, "name"),
            field(record, "data")
        );
    }
    println!("{} setup complete for {}", what, domain);
}

async fn block_storage(
    client: Arc<VultrClient>,
    action: BlockStorageAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let blocks = BlockStorageTools::new(client);
    let (tool, args, columns) = match action {
        BlockStorageAction::List => ("list", json!({}), BLOCK_COLUMNS),
        BlockStorageAction::Get { volume } => {
            ("get", json!({"volume_identifier": volume}), &[][..])
        }
        BlockStorageAction::Create {
            region,
            size_gb,
            label,
            block_type,
        } => (
            "create",
            json!({"region": region, "size_gb": size_gb, "label": label, "block_type": block_type}),
            &[][..],
        ),
        BlockStorageAction::Attach {
            volume,
            instance,
            no_live,
        } => (
            "attach",
            json!({"volume_identifier": volume, "instance_identifier": instance, "live": !no_live}),
            &[][..],
        ),
        BlockStorageAction::Detach { volume, no_live } => (
            "detach",
            json!({"volume_identifier": volume, "live": !no_live}),
            &[][..],
        ),
        BlockStorageAction::MountHelp { volume } => (
            "get_mounting_instructions",
            json!({"volume_identifier": volume}),
            &[][..],
        ),
    };
    print_result(&blocks.call(tool, args).await?, columns)
}

async fn vpcs(
    client: Arc<VultrClient>,
    action: VpcAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let vpcs = VpcTools::new(client);
    let vpc_type = |kind: NetworkKind| if kind == NetworkKind::Vpc2 { "vpc2" } else { "vpc" };

    match action {
        VpcAction::List { kind } => {
            if kind != NetworkKind::Vpc2 {
                println!("VPCs");
                print_result(&vpcs.call("list", json!({})).await?, VPC_COLUMNS)?;
            }
            if kind != NetworkKind::Vpc {
                println!("\nVPC 2.0 networks");
                print_result(&vpcs.call("list_vpc2", json!({})).await?, VPC2_COLUMNS)?;
            }
        }
        VpcAction::Create {
            region,
            description,
            kind,
            subnet,
            subnet_mask,
        } => {
            let created = if kind == NetworkKind::Vpc2 {
                let args = json!({
                    "region": region,
                    "description": description,
                    "ip_block": subnet,
                    "prefix_length": subnet_mask,
                });
                vpcs.call("create_vpc2", args).await?
            } else {
                let args = json!({
                    "region": region,
                    "description": description,
                    "v4_subnet": subnet,
                    "v4_subnet_mask": subnet_mask,
                });
                vpcs.call("create", args).await?
            };
            print_result(&created, &[])?;
        }
        VpcAction::Attach { vpc, instance, kind } => {
            let args = json!({
                "vpc_identifier": vpc,
                "instance_identifier": instance,
                "vpc_type": vpc_type(kind),
            });
            let result = vpcs.call("attach_to_instance", args).await?;
            println!("{}", field(&result, "message"));
        }
        VpcAction::Detach { vpc, instance, kind } => {
            let args = json!({
                "vpc_identifier": vpc,
                "instance_identifier": instance,
                "vpc_type": vpc_type(kind),
            });
            let result = vpcs.call("detach_from_instance", args).await?;
            println!("{}", field(&result, "message"));
        }
        VpcAction::ListInstance { instance } => {
            let args = json!({"instance_identifier": instance});
            print_result(&vpcs.call("list_instance_networks", args).await?, &[])?;
        }
        VpcAction::Info { vpc, kind } => {
            let vpc_type = match kind {
                NetworkKind::All => "auto",
                NetworkKind::Vpc => "vpc",
                NetworkKind::Vpc2 => "vpc2",
            };
            let args = json!({"identifier": vpc, "vpc_type": vpc_type});
            print_result(&vpcs.call("get_network_info", args).await?, &[])?;
        }
    }
    Ok(())
}

async fn iso(
    client: Arc<VultrClient>,
    action: IsoAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let isos = IsoTools::new(client);
    match action {
        IsoAction::List { filter } => {
            let tool = match filter {
                IsoFilter::All => "list_isos",
                IsoFilter::Public => "list_public_isos",
                IsoFilter::Custom => "list_custom_isos",
            };
            print_result(&isos.call(tool, json!({})).await?, ISO_COLUMNS)
        }
        IsoAction::Create { url } => {
            let iso = isos.call("create_iso", json!({"url": url})).await?;
            println!("ISO {} is {}", field(&iso, "id"), field(&iso, "status"));
            Ok(())
        }
    }
}

async fn startup_scripts(
    client: Arc<VultrClient>,
    action: ScriptAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let scripts = StartupScriptTools::new(client);
    match action {
        ScriptAction::List { script_type } => {
            let tool = match script_type.as_deref() {
                Some("boot") => "list_boot",
                Some("pxe") => "list_pxe",
                _ => "list",
            };
            print_result(&scripts.call(tool, json!({})).await?, SCRIPT_COLUMNS)?;
        }
        ScriptAction::Create {
            name,
            file,
            script_type,
        } => {
            let script = tokio::fs::read_to_string(&file).await?;
            let args = json!({"name": name, "script": script, "script_type": script_type});
            let created = scripts.call("create", args).await?;
            println!("Created {} script {}", script_type, field(&created, "id"));
        }
        ScriptAction::Delete { script, yes } => {
            if yes || confirm(&format!("Delete startup script {}?", script))? {
                scripts
                    .call("delete", json!({"script_identifier": script}))
                    .await?;
                println!("Startup script {} deleted", script);
            }
        }
    }
    Ok(())
}

async fn kubernetes(
    client: Arc<VultrClient>,
    action: KubernetesAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let k8s = KubernetesTools::new(client);
    match action {
        KubernetesAction::List => {
            print_result(&k8s.call("list_clusters", json!({})).await?, CLUSTER_K8S_COLUMNS)
        }
        KubernetesAction::Get { cluster } => {
            let args = json!({"cluster_identifier": cluster});
            print_result(&k8s.call("get_cluster_status", args).await?, &[])
        }
        KubernetesAction::Costs { cluster } => {
            let args = json!({"cluster_identifier": cluster});
            print_result(&k8s.call("analyze_cluster_costs", args).await?, &[])
        }
        KubernetesAction::Setup {
            label,
            region,
            workload,
            environment,
            no_auto_scaling,
        } => {
            let args = json!({
                "label": label,
                "region": region,
                "workload_type": workload,
                "environment": environment,
                "auto_scaling": !no_auto_scaling,
            });
            print_result(&k8s.call("setup_cluster_for_workload", args).await?, &[])
        }
    }
}

/// Print the tool catalog; no request is sent, so no API key is needed
fn list_tools(config: &Config, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let placeholder = SecretString::from(String::new());
    let api_key = config.api_key().unwrap_or(&placeholder);
    let transport = HttpTransport::new(&config.api, api_key)?;
    let server = build_server(config, Arc::new(VultrClient::new(Arc::new(transport))))?;
    let tools = server.tools();

    match format {
        OutputFormat::Json => {
            let catalog: Vec<Value> = tools
                .iter()
                .map(|t| json!({"name": t.name, "description": t.description}))
                .collect();
            println!("{}", serde_json::to_string_pretty(&catalog)?);
        }
        OutputFormat::Table => {
            println!("{:<48} {}", "TOOL", "DESCRIPTION");
            println!("{}", "-".repeat(100));
            for tool in &tools {
                println!("{:<48} {}", tool.name, tool.description);
            }
            println!("\n{} tools", tools.len());
        }
    }
    Ok(())
}

/// Write the default configuration file
async fn init_config(path: Option<PathBuf>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = path.unwrap_or_else(Config::default_path);

    if config_path.exists() && !force {
        return Err(format!(
            "Configuration already exists at {}. Use --force to overwrite.",
            config_path.display()
        )
        .into());
    }

    if let Some(parent) = config_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE).await?;

    println!("Configuration initialized at {}", config_path.display());
    println!("\nNext steps:");
    println!("1. Export your key: export {}=...", API_KEY_ENV);
    println!("2. Check the tool catalog: vultr-mcp tools");
    println!("3. Register `vultr-mcp serve` as a stdio MCP server in your client");
    Ok(())
}

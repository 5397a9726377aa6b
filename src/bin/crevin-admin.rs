// src/bin/crevin-admin.rs
//
// CLI de manutenção: substitui os scripts avulsos de inspeção, criação de
// usuários e rotinas financeiras. As credenciais vêm do ambiente (.env).

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crevin_backend::{
    common::{db_utils::transacao_do_sistema, format::formatar_data},
    config::{AppState, Settings},
    db::MaintenanceRepository,
    models::auth::PapelUsuario,
};

#[derive(clap::Parser)]
#[command(name = "crevin-admin", about = "Tarefas de manutenção do backend CREVIN")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Mostra colunas, quantidade de linhas e RLS de uma tabela
    CheckTable {
        tabela: String,
    },
    /// Cadastra um usuário
    CreateUser {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        nome: String,
        #[arg(short, long, default_value = "operador")]
        papel: PapelUsuario,
        #[arg(short, long, env = "CREVIN_NOVA_SENHA", hide_env_values = true)]
        senha: String,
    },
    /// Redefine a senha de um usuário
    ResetPassword {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "CREVIN_NOVA_SENHA", hide_env_values = true)]
        senha: String,
    },
    /// Aplica as migrações pendentes
    RunMigration,
    /// Gera as contas recorrentes vencidas até a data (padrão: hoje)
    GerarRecorrencias {
        #[arg(short, long)]
        data: Option<NaiveDate>,
    },
    /// Marca como vencidas as contas pendentes anteriores à data (padrão: hoje)
    MarcarVencidas {
        #[arg(short, long)]
        data: Option<NaiveDate>,
    },
}

fn hoje() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    match cli.command {
        Command::CheckTable { tabela } => {
            let repo = MaintenanceRepository::new(app_state.db_pool.clone());
            match repo.check_table(&tabela).await? {
                Some(info) => {
                    println!("Tabela: {}", info.tabela);
                    println!("Linhas: {}", info.linhas);
                    println!("RLS ativo: {}", if info.rls_ativo { "sim" } else { "não" });
                    println!("Colunas:");
                    for coluna in &info.colunas {
                        println!("  - {}", coluna);
                    }
                }
                None => anyhow::bail!("Tabela '{}' não encontrada", tabela),
            }
        }
        Command::CreateUser { email, nome, papel, senha } => {
            let user = app_state
                .auth_service
                .register_user(&app_state.db_pool, &email, &nome, papel, &senha)
                .await?;
            println!("Usuário criado: {} ({:?}) id={}", user.email, user.papel, user.id);
        }
        Command::ResetPassword { email, senha } => {
            app_state.auth_service.reset_password(&email, &senha).await?;
            println!("Senha redefinida para {}", email);
        }
        Command::RunMigration => {
            sqlx::migrate!().run(&app_state.db_pool).await?;
            tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
        }
        Command::GerarRecorrencias { data } => {
            let data = data.unwrap_or_else(hoje);
            let resumo = app_state.recurrence_service.executar(data).await?;
            println!(
                "Recorrências até {}: {} geradas, {} já existentes, {} falhas",
                formatar_data(data),
                resumo.geradas,
                resumo.ignoradas,
                resumo.falhas
            );
            if let Some(mensagem) = resumo.mensagem() {
                println!("{}", mensagem);
            }
            if resumo.falhas > 0 {
                anyhow::bail!("{} conta(s) falharam; veja o log", resumo.falhas);
            }
        }
        Command::MarcarVencidas { data } => {
            let data = data.unwrap_or_else(hoje);

            // Recorrente vencida só é marcada depois de gerar a sucessora
            app_state.recurrence_service.executar(data).await?;

            let mut tx = transacao_do_sistema(&app_state.db_pool).await?;
            let resultado = app_state.finance_service.marcar_vencidas(&mut *tx, data).await?;
            tx.commit().await?;

            println!(
                "Vencidas antes de {}: {} a pagar, {} a receber",
                formatar_data(data),
                resultado.contas_pagar,
                resultado.contas_receber
            );
        }
    }

    Ok(())
}

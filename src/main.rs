mod constants;
mod defaults;
mod gw;
mod io;
mod scf;
mod tdhf;
mod utils;

use crate::defaults::CONFIG_FILE_NAME;
use crate::gw::{print_gw_init, print_qp_energies, Gw, RootMethod};
use crate::io::{read_input, write_header, Configuration};
use crate::utils::Timer;
use anyhow::{Context, Result};
use clap::{crate_version, App, Arg};
use log::info;
use log::LevelFilter;
use ndarray::prelude::*;
use std::fs;
use std::path::Path;
use std::str::FromStr;

fn main() -> Result<()> {
    let matches = App::new("rusty-gw")
        .version(crate_version!())
        .about("GW quasiparticle corrections on top of a TDHF calculation")
        .arg(
            Arg::new("config")
                .about("toml configuration file")
                .default_value(CONFIG_FILE_NAME)
                .index(1),
        )
        .get_matches();

    // the config file is optional, every field has a default
    let config_path: &str = matches.value_of("config").unwrap();
    let content: String = if Path::new(config_path).is_file() {
        fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path))?
    } else {
        String::new()
    };
    let config: Configuration =
        toml::from_str(&content).with_context(|| format!("malformed config in {}", config_path))?;

    let level: LevelFilter = match config.verbose {
        x if x > 0 => LevelFilter::Debug,
        0 => LevelFilter::Info,
        _ => LevelFilter::Warn,
    };
    pretty_env_logger::formatted_builder()
        .filter_level(level)
        .init();

    write_header();
    let timer: Timer = Timer::start();

    let (tdhf, mut scf) = read_input(Path::new(&config.data.path))?;
    let nocc: usize = tdhf.eri.nocc;
    let nmo: usize = tdhf.eri.nmo();
    let mo_energy: Array1<f64> = tdhf.eri.mo_energy.clone();

    let mut gw = Gw::new(&tdhf, &mut scf);
    gw.params.method = RootMethod::from_str(&config.gw.method)?;
    gw.params.eta = config.gw.eta;
    gw.params.vir_sign = config.gw.vir_sign;
    gw.params.tol = config.gw.tol;
    gw.params.max_iter = config.gw.max_iter;
    gw.params.linearized = config.gw.linearized;
    gw.orbs = config.gw.orbs.clone().map(|orbs| vec![orbs]);

    let orbs: Vec<usize> = config
        .gw
        .orbs
        .clone()
        .unwrap_or_else(|| (0..nmo).collect());
    print_gw_init(orbs.len(), &gw.params);

    let qp_energy = gw.kernel()?;
    let qp_energy: Array1<f64> = qp_energy
        .into_dimensionality::<Ix1>()
        .expect("molecular corrections carry a single orbital axis");

    print_qp_energies(mo_energy.view(), qp_energy.view(), &orbs, nocc);
    info!("{}", timer);
    Ok(())
}

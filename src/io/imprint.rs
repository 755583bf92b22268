use chrono::Local;
use clap::crate_version;
use log::info;

pub fn write_header() {
    info!("{: ^80}", "-----------------");
    info!("{: ^80}", "RUSTY-GW");
    info!("{: ^80}", "-----------------");
    let mut version_string: String = "version: ".to_owned();
    version_string.push_str(crate_version!());
    info!("{: ^80}", version_string);
    info!("{: ^80}", "");
    info!("{: ^80}", "::::::::::::::::::::::::::::::::::::::");
    info!("{: ^80}", "::           Roland Mitric          ::");
    info!("{: ^80}", "::  Chair of theoretical chemistry  ::");
    info!("{: ^80}", "::      University of Wuerzburg     ::");
    info!("{: ^80}", "::::::::::::::::::::::::::::::::::::::");
    info!("{: ^80}", "");
    info!(
        "{: ^80}",
        format!("started at {}", Local::now().format("%d.%m.%Y %H:%M:%S"))
    );
    info!("{: ^80}", "");
}

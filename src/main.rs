use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    let code = noxis::run()?;
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

fn main() -> std::process::ExitCode {
    photoshare_lib::run()
}
